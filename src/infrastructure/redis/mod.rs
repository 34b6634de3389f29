//! Redis-backed stores.
//!
//! Both stores hold a `redis::Client` and open a multiplexed connection per
//! call, so they can be shared freely between request handlers.

mod credential_store;
mod session_store;

pub use credential_store::RedisCredentialStore;
pub use session_store::RedisSessionStore;

use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::Client;

/// Creates a new multiplexed Redis connection.
async fn get_conn(client: &Client) -> Result<MultiplexedConnection> {
    // ---
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|err| {
            tracing::error!("Failed to connect to Redis: {:?}", err);
            err
        })
        .context("redis connection failed")
}
