//! Session construction options

use indexmap::IndexMap;
use std::time::Duration;

/// Initial state for a new session
///
/// Values and shows are sent right after the console is configured and are
/// replayed after every restart. An empty `settings` list means the
/// protocol's default settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub values: IndexMap<String, String>,
    pub shows: Vec<String>,
    pub settings: Vec<String>,
    /// How long `close` waits for the engine to exit after `QUIT`
    pub shutdown_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
            shows: Vec::new(),
            settings: Vec::new(),
            shutdown_grace: Duration::from_millis(500),
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn show(mut self, name: impl Into<String>) -> Self {
        self.shows.push(name.into());
        self
    }

    pub fn shows<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shows.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn setting(mut self, setting: impl Into<String>) -> Self {
        self.settings.push(setting.into());
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
