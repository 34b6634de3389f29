use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::{SessionField, SessionStore};

type Sessions = HashMap<String, HashMap<SessionField, String>>;

/// `SessionStore` held in process memory. Sessions never expire.
#[derive(Default)]
pub struct InMemorySessionStore {
    // ---
    sessions: Mutex<Sessions>,
}

impl InMemorySessionStore {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, Sessions>> {
        // ---
        self.sessions
            .lock()
            .map_err(|_| anyhow!("in-memory session store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    // ---
    async fn get_field(&self, token: &str, field: SessionField) -> Result<Option<String>> {
        // ---
        Ok(self
            .sessions()?
            .get(token)
            .and_then(|fields| fields.get(&field))
            .cloned())
    }

    async fn set_field(&self, token: &str, field: SessionField, value: &str) -> Result<()> {
        // ---
        self.sessions()?
            .entry(token.to_string())
            .or_default()
            .insert(field, value.to_string());
        Ok(())
    }

    async fn take_field(&self, token: &str, field: SessionField) -> Result<Option<String>> {
        // ---
        Ok(self
            .sessions()?
            .get_mut(token)
            .and_then(|fields| fields.remove(&field)))
    }
}
