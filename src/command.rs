//! Console commands understood by ISOTROPY
//!
//! Every line written to the engine goes through [`EngineCommand`], so the
//! wire text lives in one `Display` impl.

use std::fmt;

/// Page length setting for the `PAGE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Break pages every `n` lines
    Lines(u32),
    /// Never break pages
    NoBreak,
}

impl From<Option<u32>> for PageMode {
    fn from(length: Option<u32>) -> Self {
        match length {
            Some(n) => PageMode::Lines(n),
            None => PageMode::NoBreak,
        }
    }
}

/// A single console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// `SCREEN n`
    Screen(u32),
    /// `PAGE n` or `PAGE NOBREAK`
    Page(PageMode),
    /// `SETTING <name>`
    Setting(String),
    /// `VALUE <KEY> <value>`
    Value { key: String, value: String },
    /// `CANCEL VALUE <KEY>`
    CancelValue(String),
    /// `CANCEL VALUE ALL`
    CancelValueAll,
    /// `SHOW <NAME>`
    Show(String),
    /// `CANCEL SHOW <NAME>`
    CancelShow(String),
    /// `CANCEL SHOW ALL`
    CancelShowAll,
    /// `DISPLAY <NAME>`
    Display(String),
    /// Empty line answering an "Enter RETURN" sub-prompt
    Acknowledge,
    /// `QUIT`
    Quit,
}

impl EngineCommand {
    /// Whether this command mutates the engine's remembered values or shows
    pub fn touches_state(&self) -> bool {
        matches!(
            self,
            EngineCommand::Value { .. }
                | EngineCommand::CancelValue(_)
                | EngineCommand::CancelValueAll
                | EngineCommand::Show(_)
                | EngineCommand::CancelShow(_)
                | EngineCommand::CancelShowAll
        )
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Screen(width) => write!(f, "SCREEN {}", width),
            EngineCommand::Page(PageMode::Lines(n)) => write!(f, "PAGE {}", n),
            EngineCommand::Page(PageMode::NoBreak) => write!(f, "PAGE NOBREAK"),
            EngineCommand::Setting(name) => write!(f, "SETTING {}", name),
            EngineCommand::Value { key, value } => write!(f, "VALUE {} {}", key, value),
            EngineCommand::CancelValue(key) => write!(f, "CANCEL VALUE {}", key),
            EngineCommand::CancelValueAll => write!(f, "CANCEL VALUE ALL"),
            EngineCommand::Show(name) => write!(f, "SHOW {}", name),
            EngineCommand::CancelShow(name) => write!(f, "CANCEL SHOW {}", name),
            EngineCommand::CancelShowAll => write!(f, "CANCEL SHOW ALL"),
            EngineCommand::Display(name) => write!(f, "DISPLAY {}", name),
            EngineCommand::Acknowledge => Ok(()),
            EngineCommand::Quit => write!(f, "QUIT"),
        }
    }
}
