//! Engine transport traits
//!
//! These traits separate the console protocol from how the engine is
//! actually run, so sessions can be driven by a recorded script in tests.

use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Line-oriented duplex connection to one running engine
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Read one line without its terminator; `None` once the pipe is closed
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Write `line` plus a newline and flush
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Wait up to `grace` for the engine to exit, then force it down
    async fn terminate(&mut self, grace: Duration) -> Result<()>;

    /// OS process id, if there is a real process behind the transport
    fn pid(&self) -> Option<u32>;
}

/// Factory for engine transports
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    type Transport: Transport + 'static;

    /// Start a fresh engine
    async fn launch(&self) -> Result<Self::Transport>;

    /// Delete the scratch database files the engine left in its working
    /// directory, returning what was removed
    fn remove_scratch_files(&self) -> Result<Vec<PathBuf>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
