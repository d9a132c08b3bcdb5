//! Per-virtual-user session state.
//!
//! Each virtual user owns exactly one [`SessionState`]. It carries the
//! login-failed flag and a small key/value store for handing data from one
//! action to the next (for example an issue key created by one action and
//! edited by a later one). Nothing here is shared between sessions.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The virtual user should end now.
    #[error("Stopping virtual user: {0}")]
    StopUser(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    login_failed: bool,
    storage: HashMap<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_failed(&self) -> bool {
        self.login_failed
    }

    pub fn mark_login_failed(&mut self) {
        self.login_failed = true;
    }

    /// Stop signal for the runner once a login action has failed.
    pub fn raise_if_login_failed(&self, action_name: &str) -> Result<(), SessionError> {
        if self.login_failed {
            return Err(SessionError::StopUser(format!(
                "Action {} failed",
                action_name
            )));
        }
        Ok(())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.storage.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    /// String value stored under `key`, if it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.storage.get(key).and_then(Value::as_str)
    }

    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.storage.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    /// Forget stored values; the login flag is kept.
    pub fn clear_storage(&mut self) {
        self.storage.clear();
    }
}
