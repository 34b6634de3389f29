use anyhow::{bail, Context, Result};
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::get_conn;
use crate::domain::{Credential, CredentialStore, CredentialTaken, User};

// Key layout:
//   passkey:user:{uuid}          -> User JSON (primary record)
//   passkey:email:{email}        -> user uuid
//   passkey:credential:{hex id}  -> CredentialIndexEntry JSON

const MAX_UPSERT_ATTEMPTS: usize = 3;

fn user_key(user_id: Uuid) -> String {
    format!("passkey:user:{user_id}")
}

fn email_key(email: &str) -> String {
    format!("passkey:email:{email}")
}

fn credential_key(credential_id: &[u8]) -> String {
    format!("passkey:credential:{}", hex::encode(credential_id))
}

/// Secondary index entry: credential ID straight to its owner.
#[derive(Serialize, Deserialize)]
struct CredentialIndexEntry {
    user_id: Uuid,
    credential: Credential,
}

/// `CredentialStore` over plain Redis string keys.
pub struct RedisCredentialStore {
    // ---
    client: Client,
}

impl RedisCredentialStore {
    // ---
    pub fn new(client: Client) -> Self {
        // ---
        Self { client }
    }

    async fn load_user(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        user_id: Uuid,
    ) -> Result<Option<User>> {
        // ---
        let raw: Option<String> = conn.get(user_key(user_id)).await?;
        raw.map(|json| serde_json::from_str(&json).context("corrupt user record"))
            .transpose()
    }

    /// Fails with [`CredentialTaken`] if any of `user`'s credentials is
    /// indexed under someone else.
    async fn ensure_index_owner(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        user: &User,
    ) -> Result<()> {
        // ---
        for credential in &user.credentials {
            let raw: Option<String> = conn.get(credential_key(&credential.id)).await?;
            let Some(raw) = raw else {
                continue;
            };

            let entry: CredentialIndexEntry =
                serde_json::from_str(&raw).context("corrupt credential index entry")?;
            if entry.user_id != user.id {
                return Err(CredentialTaken {
                    credential_id: hex::encode(&credential.id),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for RedisCredentialStore {
    // ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        // ---
        let mut conn = get_conn(&self.client).await?;

        let raw_id: Option<String> = conn.get(email_key(email)).await?;
        let Some(raw_id) = raw_id else {
            return Ok(None);
        };
        let user_id = Uuid::parse_str(&raw_id).context("corrupt email index entry")?;

        self.load_user(&mut conn, user_id).await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        self.load_user(&mut conn, user_id).await
    }

    async fn find_credential_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<(Uuid, Credential)>> {
        // ---
        let mut conn = get_conn(&self.client).await?;

        let raw: Option<String> = conn.get(credential_key(credential_id)).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let entry: CredentialIndexEntry =
            serde_json::from_str(&raw).context("corrupt credential index entry")?;
        Ok(Some((entry.user_id, entry.credential)))
    }

    async fn insert_user_if_absent(&self, user: User) -> Result<User> {
        // ---
        let mut conn = get_conn(&self.client).await?;

        // The record goes in first so the email index never points at nothing.
        let user_json = serde_json::to_string(&user)?;
        let _: () = conn.set(user_key(user.id), user_json).await?;

        let claimed: bool = conn
            .set_nx(email_key(&user.email), user.id.to_string())
            .await?;
        if claimed {
            return Ok(user);
        }

        // Lost the race: drop our orphan record and hand back the winner.
        let _: () = conn.del(user_key(user.id)).await?;
        tracing::debug!("Concurrent registration resolved to existing user");

        let raw_id: Option<String> = conn.get(email_key(&user.email)).await?;
        let winner_id = raw_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .context("corrupt email index entry")?
            .context("email index entry vanished")?;

        self.load_user(&mut conn, winner_id)
            .await?
            .context("winning user record missing")
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        let index_keys: Vec<String> = user
            .credentials
            .iter()
            .map(|credential| credential_key(&credential.id))
            .collect();

        // The credential index entries are WATCHed so a concurrent registration
        // of the same credential ID aborts this EXEC instead of repointing it.
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            if !index_keys.is_empty() {
                let _: () = redis::cmd("WATCH")
                    .arg(&index_keys)
                    .query_async(&mut conn)
                    .await?;

                if let Err(err) = self.ensure_index_owner(&mut conn, user).await {
                    let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                    return Err(err);
                }
            }

            let mut pipe = redis::pipe();
            pipe.atomic()
                .set(user_key(user.id), serde_json::to_string(user)?)
                .ignore()
                .set(email_key(&user.email), user.id.to_string())
                .ignore();

            for credential in &user.credentials {
                let entry = CredentialIndexEntry {
                    user_id: user.id,
                    credential: credential.clone(),
                };
                pipe.set(credential_key(&credential.id), serde_json::to_string(&entry)?)
                    .ignore();
            }

            // EXEC replies nil when a watched key changed.
            let committed: Option<()> = pipe.query_async(&mut conn).await?;
            if committed.is_some() {
                return Ok(());
            }
            tracing::debug!("Credential index changed during upsert, attempt {}", attempt);
        }

        bail!("credential index kept changing for user {}", user.id)
    }

    async fn ping(&self) -> Result<()> {
        // ---
        let mut conn = get_conn(&self.client).await?;
        let _: String = conn.ping().await?;
        Ok(())
    }
}
