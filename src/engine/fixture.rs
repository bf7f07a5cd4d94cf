//! Scripted engine for tests and offline runs
//!
//! A [`ScriptedLauncher`] hands out transports that answer each written line
//! by calling a responder closure. The closure sees which launch it is
//! serving (restarts bump the counter) and the command text, or `None` for
//! the startup banner. Everything written is recorded per launch.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::transport::{Launcher, Transport};
use crate::error::{Error, Result};

/// Default ready banner printed by a scripted engine
pub const READY_BANNER: &str =
    "Current setting is International (new ed.) with conventional basis vectors.";

/// What the scripted engine is responding to
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    /// Zero-based launch counter
    pub launch: usize,
    /// Command line written, or `None` at startup
    pub command: Option<&'a str>,
}

type Responder = dyn Fn(&Exchange<'_>) -> Vec<String> + Send + Sync;

#[derive(Debug, Default)]
struct FixtureLog {
    commands: Vec<Vec<String>>,
    cleanups: usize,
    terminations: usize,
}

/// Launcher for [`ScriptedTransport`]s; clones share one log
#[derive(Clone)]
pub struct ScriptedLauncher {
    responder: Arc<Responder>,
    log: Arc<Mutex<FixtureLog>>,
}

impl std::fmt::Debug for ScriptedLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedLauncher")
            .field("log", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl ScriptedLauncher {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Exchange<'_>) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            log: Arc::new(Mutex::new(FixtureLog::default())),
        }
    }

    /// An engine that prints the standard banner, acknowledges every
    /// command with a prompt, and answers `DISPLAY` through `display`
    /// (`None` means an empty block)
    pub fn with_displays<F>(display: F) -> Self
    where
        F: Fn(usize, &str) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self::new(move |exchange| match exchange.command {
            None => banner(),
            Some(command) => match command.strip_prefix("DISPLAY ") {
                Some(name) => display_block(display(exchange.launch, name).unwrap_or_default()),
                None => prompt(),
            },
        })
    }

    fn lock(&self) -> MutexGuard<'_, FixtureLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of transports handed out so far
    pub fn launches(&self) -> usize {
        self.lock().commands.len()
    }

    /// Commands written to the transport of launch `launch`
    pub fn commands(&self, launch: usize) -> Vec<String> {
        self.lock().commands.get(launch).cloned().unwrap_or_default()
    }

    /// Commands written across every launch, in order
    pub fn all_commands(&self) -> Vec<String> {
        self.lock().commands.concat()
    }

    /// How many times scratch cleanup ran
    pub fn cleanups(&self) -> usize {
        self.lock().cleanups
    }

    /// How many transports were terminated
    pub fn terminations(&self) -> usize {
        self.lock().terminations
    }
}

#[async_trait::async_trait]
impl Launcher for ScriptedLauncher {
    type Transport = ScriptedTransport;

    async fn launch(&self) -> Result<ScriptedTransport> {
        let launch = {
            let mut log = self.lock();
            log.commands.push(Vec::new());
            log.commands.len() - 1
        };
        let pending = (self.responder)(&Exchange {
            launch,
            command: None,
        });
        Ok(ScriptedTransport {
            launcher: self.clone(),
            launch,
            pending: pending.into(),
            closed: false,
        })
    }

    fn remove_scratch_files(&self) -> Result<Vec<PathBuf>> {
        self.lock().cleanups += 1;
        Ok(Vec::new())
    }

    fn describe(&self) -> String {
        "scripted isotropy".to_string()
    }
}

/// One scripted engine instance
#[derive(Debug)]
pub struct ScriptedTransport {
    launcher: ScriptedLauncher,
    launch: usize,
    pending: VecDeque<String>,
    closed: bool,
}

impl ScriptedTransport {
    /// Lines queued but not yet read
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.pending.pop_front())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(Error::from_pipe(std::io::ErrorKind::BrokenPipe.into()));
        }
        if let Some(commands) = self.launcher.lock().commands.get_mut(self.launch) {
            commands.push(line.to_string());
        }
        if line == "QUIT" {
            self.closed = true;
            return Ok(());
        }
        let response = (self.launcher.responder)(&Exchange {
            launch: self.launch,
            command: Some(line),
        });
        self.pending.extend(response);
        Ok(())
    }

    async fn terminate(&mut self, _grace: Duration) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        self.launcher.lock().terminations += 1;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Startup output: a couple of banner lines, the ready banner and a prompt
pub fn banner() -> Vec<String> {
    vec![
        String::new(),
        "ISOTROPY Software Suite".to_string(),
        READY_BANNER.to_string(),
        "*".to_string(),
    ]
}

/// Reply to a command that prints nothing
pub fn prompt() -> Vec<String> {
    vec!["*".to_string()]
}

/// Reply to a `DISPLAY`: the rows, the blank line that ends the block,
/// then the prompt for the next command
pub fn display_block<S: Into<String>>(rows: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut lines: Vec<String> = rows.into_iter().map(Into::into).collect();
    lines.push(String::new());
    lines.push("*".to_string());
    lines
}
