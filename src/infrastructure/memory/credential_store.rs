use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{Credential, CredentialStore, CredentialTaken, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    credentials: HashMap<Vec<u8>, (Uuid, Credential)>,
}

/// `CredentialStore` held in process memory.
///
/// Every write happens under one lock, which gives the same all-or-nothing
/// behaviour the Redis store gets from `MULTI`/`EXEC`.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    // ---
    tables: Mutex<Tables>,
    writes: AtomicUsize,
}

impl InMemoryCredentialStore {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    /// Number of mutating calls served so far.
    pub fn write_count(&self) -> usize {
        // ---
        self.writes.load(Ordering::SeqCst)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        // ---
        self.tables
            .lock()
            .map_err(|_| anyhow!("in-memory credential store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    // ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        // ---
        let tables = self.tables()?;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        // ---
        Ok(self.tables()?.users.get(&user_id).cloned())
    }

    async fn find_credential_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<(Uuid, Credential)>> {
        // ---
        Ok(self.tables()?.credentials.get(credential_id).cloned())
    }

    async fn insert_user_if_absent(&self, user: User) -> Result<User> {
        // ---
        let mut tables = self.tables()?;

        if let Some(existing) = tables
            .emails
            .get(&user.email)
            .and_then(|id| tables.users.get(id))
        {
            return Ok(existing.clone());
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        // ---
        let mut tables = self.tables()?;

        let taken = user.credentials.iter().find(|credential| {
            matches!(tables.credentials.get(&credential.id), Some((owner, _)) if *owner != user.id)
        });
        if let Some(credential) = taken {
            return Err(CredentialTaken {
                credential_id: hex::encode(&credential.id),
            }
            .into());
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        tables.emails.insert(user.email.clone(), user.id);
        for credential in &user.credentials {
            tables
                .credentials
                .insert(credential.id.clone(), (user.id, credential.clone()));
        }
        tables.users.insert(user.id, user.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::{AdvisoryTransports, DeviceType};

    fn credential(id: u8) -> Credential {
        // ---
        Credential {
            id: vec![id],
            public_key: vec![0xAA],
            counter: 0,
            device_type: DeviceType::SingleDevice,
            backup_eligible: false,
            backed_up: false,
            transports: AdvisoryTransports::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_first_user() {
        // ---
        let store = InMemoryCredentialStore::new();

        let first = store
            .insert_user_if_absent(User::new("a@x.com".into(), "Alice".into()))
            .await
            .unwrap();
        let second = store
            .insert_user_if_absent(User::new("a@x.com".into(), "Impostor".into()))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alice");
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn upsert_indexes_user_and_credentials() {
        // ---
        let store = InMemoryCredentialStore::new();
        let mut user = User::new("a@x.com".into(), "Alice".into());
        user.credentials.push(credential(1));
        user.credentials.push(credential(2));

        store.upsert_user(&user).await.unwrap();

        assert_eq!(store.find_user_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.find_user_by_email("a@x.com").await.unwrap(),
            Some(user.clone())
        );
        for id in [1u8, 2] {
            let (owner, found) = store.find_credential_by_id(&[id]).await.unwrap().unwrap();
            assert_eq!(owner, user.id);
            assert_eq!(found.id, vec![id]);
        }
        assert!(store.find_credential_by_id(&[3]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_records_are_none() {
        // ---
        let store = InMemoryCredentialStore::new();
        assert!(store.find_user_by_email("nobody").await.unwrap().is_none());
        assert!(store.find_user_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_refuses_credential_owned_by_another_user() {
        // ---
        let store = InMemoryCredentialStore::new();
        let mut alice = User::new("a@x.com".into(), "Alice".into());
        alice.credentials.push(credential(1));
        store.upsert_user(&alice).await.unwrap();

        let mut bob = User::new("b@x.com".into(), "Bob".into());
        bob.credentials.push(credential(1));
        let err = store.upsert_user(&bob).await.unwrap_err();

        assert!(err.downcast_ref::<CredentialTaken>().is_some());
        let (owner, _) = store.find_credential_by_id(&[1]).await.unwrap().unwrap();
        assert_eq!(owner, alice.id);
        assert!(store.find_user_by_email("b@x.com").await.unwrap().is_none());
        assert_eq!(store.write_count(), 1);
    }
}
