//! Engine process plumbing
//!
//! The session never touches a child process directly. It talks to a
//! [`Transport`] produced by a [`Launcher`]:
//!
//! - [`process`] spawns the real ISOTROPY executable under tokio
//! - [`fixture`] replays scripted console output for tests
//!
//! Every line read from a transport goes through [`reader::read_checked_line`],
//! which logs it and turns the engine's fatal phrasings into typed errors.

pub mod fixture;
pub mod process;
pub mod reader;
pub mod signatures;
pub mod transport;

pub use fixture::{Exchange, ScriptedLauncher, ScriptedTransport};
pub use process::{ProcessLauncher, ProcessTransport};
pub use reader::read_checked_line;
pub use signatures::{EngineFault, SignatureTable};
pub use transport::{Launcher, Transport};
