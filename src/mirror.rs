//! Remote State Mirror
//!
//! ISOTROPY remembers every `VALUE` and `SHOW` it has been given until they
//! are cancelled. [`ValueMap`] and [`ShowSet`] keep a local copy of that
//! state so redundant commands are never sent. Mutating methods return the
//! command that reconciles the engine (or `None` when nothing changed); the
//! session is responsible for actually writing it.

use indexmap::{IndexMap, IndexSet};

use crate::command::EngineCommand;
use crate::error::{Error, Result};

fn normalize(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Values currently set in the engine, keyed by upper-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    values: IndexMap<String, String>,
}

impl ValueMap {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the `VALUE` command if anything changed
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Option<EngineCommand> {
        let value = value.into();
        let command = self.set_command(key, &value)?;
        self.values.insert(normalize(key), value);
        Some(command)
    }

    /// The command [`set`](Self::set) would return, leaving the mirror untouched
    pub fn set_command(&self, key: &str, value: &str) -> Option<EngineCommand> {
        let key = normalize(key);
        if self.values.get(&key).map(String::as_str) == Some(value) {
            return None;
        }
        Some(EngineCommand::Value {
            key,
            value: value.to_string(),
        })
    }

    /// Remove `key`, returning the `CANCEL VALUE` command
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key was never set.
    pub fn delete(&mut self, key: &str) -> Result<EngineCommand> {
        let command = self.delete_command(key)?;
        self.values.shift_remove(&normalize(key));
        Ok(command)
    }

    /// The command [`delete`](Self::delete) would return, leaving the mirror untouched
    pub fn delete_command(&self, key: &str) -> Result<EngineCommand> {
        let key = normalize(key);
        if !self.values.contains_key(&key) {
            return Err(Error::KeyNotFound { key });
        }
        Ok(EngineCommand::CancelValue(key))
    }

    /// Forget every value; a single `CANCEL VALUE ALL` covers any map size
    pub fn clear_all(&mut self) -> EngineCommand {
        self.values.clear();
        EngineCommand::CancelValueAll
    }

    /// Current value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize(key)).map(String::as_str)
    }

    /// Whether `key` is set
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&normalize(key))
    }

    /// Iterate `(KEY, value)` pairs in the order they were first set
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Commands that rebuild this state in a freshly started engine
    pub fn replay(&self) -> Vec<EngineCommand> {
        self.iter()
            .map(|(key, value)| EngineCommand::Value {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect()
    }
}

/// Display fields currently requested from the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowSet {
    shows: IndexSet<String>,
}

impl ShowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `name`, returning the `SHOW` command if it was not yet shown
    pub fn add(&mut self, name: &str) -> Option<EngineCommand> {
        let command = self.add_command(name)?;
        self.shows.insert(normalize(name));
        Some(command)
    }

    /// The command [`add`](Self::add) would return, leaving the mirror untouched
    pub fn add_command(&self, name: &str) -> Option<EngineCommand> {
        let name = normalize(name);
        (!self.shows.contains(&name)).then(|| EngineCommand::Show(name))
    }

    /// Stop showing `name`; absent names are a no-op rather than an error
    pub fn remove(&mut self, name: &str) -> Option<EngineCommand> {
        let command = self.remove_command(name)?;
        self.shows.shift_remove(&normalize(name));
        Some(command)
    }

    /// The command [`remove`](Self::remove) would return, leaving the mirror untouched
    pub fn remove_command(&self, name: &str) -> Option<EngineCommand> {
        let name = normalize(name);
        self.shows
            .contains(&name)
            .then(|| EngineCommand::CancelShow(name))
    }

    /// Forget every show with a single `CANCEL SHOW ALL`
    pub fn clear_all(&mut self) -> EngineCommand {
        self.shows.clear();
        EngineCommand::CancelShowAll
    }

    /// Case-insensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.shows.contains(&normalize(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.shows.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// Commands that rebuild this state in a freshly started engine
    pub fn replay(&self) -> Vec<EngineCommand> {
        self.iter()
            .map(|name| EngineCommand::Show(name.to_string()))
            .collect()
    }
}
