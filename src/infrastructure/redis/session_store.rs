use anyhow::{Context, Result};
use redis::{AsyncCommands, Client};
use std::time::Duration;

use super::get_conn;
use crate::domain::{SessionField, SessionStore};

fn session_key(token: &str) -> String {
    format!("session:{token}")
}

/// `SessionStore` keeping each session as a Redis hash.
///
/// Every write refreshes the hash's TTL, so a session lives for `ttl` after
/// its last ceremony step.
pub struct RedisSessionStore {
    // ---
    client: Client,
    ttl: Duration,
}

impl RedisSessionStore {
    // ---
    pub fn new(client: Client, ttl: Duration) -> Self {
        // ---
        Self { client, ttl }
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    // ---
    async fn get_field(&self, token: &str, field: SessionField) -> Result<Option<String>> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        let value: Option<String> = conn.hget(session_key(token), field.as_str()).await?;
        Ok(value)
    }

    async fn set_field(&self, token: &str, field: SessionField, value: &str) -> Result<()> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        let key = session_key(token);
        let ttl_secs = i64::try_from(self.ttl.as_secs()).context("session TTL out of range")?;

        let _: () = redis::pipe()
            .atomic()
            .hset(&key, field.as_str(), value)
            .ignore()
            .expire(&key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn take_field(&self, token: &str, field: SessionField) -> Result<Option<String>> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        let key = session_key(token);

        // A challenge must be consumed, not fetched then deleted later, i.e. this
        // must be atomic
        let (value,): (Option<String>,) = redis::pipe()
            .atomic()
            .hget(&key, field.as_str())
            .hdel(&key, field.as_str())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(value)
    }
}
