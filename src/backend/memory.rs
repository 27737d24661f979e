use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    normalize_email, AuthProvider, AuthSubscription, BackendError, ClientStore, PrincipalFeed,
    ProfileStore, Result,
};
use crate::auth::password::{hash_password, verify_password};
use crate::models::{Client, ClientDraft, Identity, Principal, Role};

struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
}

/// Process-local backend. Used for `--in-memory` runs and as the test double
/// for the external services.
#[derive(Default)]
pub struct MemoryBackend {
    feed: PrincipalFeed,
    accounts: Mutex<Vec<Account>>,
    profiles: Mutex<HashMap<Uuid, Identity>>,
    clients: Mutex<Vec<Client>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account and its profile without signing in.
    pub fn seed_user(&self, email: &str, password: &str, name: &str, role: Role) -> Result<Identity> {
        let account = self.create_account(email, password)?;
        let identity = Identity {
            id: account.id,
            email: account.email,
            role,
            name: name.to_string(),
        };
        self.profiles.lock().insert(identity.id, identity.clone());
        Ok(identity)
    }

    /// One account per role, all with the password `demo`.
    pub fn seed_demo(&self) -> Result<Vec<Identity>> {
        [
            ("admin@demo.local", "Demo Admin", Role::Admin),
            ("user@demo.local", "Demo User", Role::User),
            ("supervisor@demo.local", "Demo Supervisor", Role::Supervisor),
        ]
        .into_iter()
        .map(|(email, name, role)| self.seed_user(email, "demo", name, role))
        .collect()
    }

    /// Make every call fail with [`BackendError::Unavailable`].
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        Ok(())
    }

    fn create_account(&self, email: &str, password: &str) -> Result<Principal> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.lock();
        if accounts.iter().any(|a| a.email == email) {
            return Err(BackendError::AlreadyExists {
                entity: "account",
                field: "email",
                value: email,
            });
        }

        let account = Account {
            id: Uuid::new_v4(),
            email,
            password_hash,
        };
        let principal = Principal {
            id: account.id,
            email: account.email.clone(),
        };
        accounts.push(account);
        Ok(principal)
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    fn subscribe(&self) -> AuthSubscription {
        self.feed.subscribe()
    }

    fn listener_count(&self) -> usize {
        self.feed.listener_count()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        self.ensure_online()?;
        let email = normalize_email(email);

        let principal = {
            let accounts = self.accounts.lock();
            let account = accounts
                .iter()
                .find(|a| a.email == email)
                .ok_or(BackendError::InvalidCredentials)?;
            if !verify_password(password, &account.password_hash)? {
                return Err(BackendError::InvalidCredentials);
            }
            Principal {
                id: account.id,
                email: account.email.clone(),
            }
        };

        debug!(principal = %principal.id, "signed in");
        self.feed.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn register(&self, email: &str, password: &str) -> Result<Principal> {
        self.ensure_online()?;
        let principal = self.create_account(email, password)?;
        self.feed.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<()> {
        self.ensure_online()?;
        self.feed.publish(None);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Identity>> {
        self.ensure_online()?;
        Ok(self.profiles.lock().get(&id).cloned())
    }

    async fn insert_profile(&self, identity: &Identity) -> Result<()> {
        self.ensure_online()?;
        self.profiles.lock().insert(identity.id, identity.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Identity>> {
        self.ensure_online()?;
        let mut profiles: Vec<Identity> = self.profiles.lock().values().cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }
}

#[async_trait]
impl ClientStore for MemoryBackend {
    async fn list_clients(&self, limit: Option<i64>) -> Result<Vec<Client>> {
        self.ensure_online()?;
        let mut clients = self.clients.lock().clone();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            clients.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(clients)
    }

    async fn find_by_identification(&self, identification_number: &str) -> Result<Option<Client>> {
        self.ensure_online()?;
        Ok(self
            .clients
            .lock()
            .iter()
            .find(|c| c.identification_number == identification_number)
            .cloned())
    }

    async fn insert_client(
        &self,
        draft: &ClientDraft,
        created_at: DateTime<Utc>,
        created_by: Uuid,
    ) -> Result<Client> {
        self.ensure_online()?;
        let mut clients = self.clients.lock();
        if clients
            .iter()
            .any(|c| c.identification_number == draft.identification_number)
        {
            return Err(BackendError::AlreadyExists {
                entity: "client",
                field: "identification_number",
                value: draft.identification_number.clone(),
            });
        }

        let client = Client {
            id: Uuid::new_v4(),
            identification_number: draft.identification_number.clone(),
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            address: draft.address.clone(),
            created_at,
            created_by,
        };
        clients.push(client.clone());
        Ok(client)
    }

    async fn delete_client(&self, id: Uuid) -> Result<()> {
        self.ensure_online()?;
        self.clients.lock().retain(|c| c.id != id);
        Ok(())
    }

    async fn count_clients(&self) -> Result<i64> {
        self.ensure_online()?;
        Ok(self.clients.lock().len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_publishes_principal() {
        let backend = MemoryBackend::new();
        let ana = backend
            .seed_user("Ana@Example.com", "pw", "Ana", Role::User)
            .unwrap();
        let mut subscription = backend.subscribe();
        assert_eq!(subscription.poll(), Some(None));

        let principal = backend.sign_in("ana@example.com", "pw").await.unwrap();
        assert_eq!(principal.id, ana.id);
        assert_eq!(subscription.poll(), Some(Some(principal)));

        backend.sign_out().await.unwrap();
        assert_eq!(subscription.poll(), Some(None));
    }

    #[tokio::test]
    async fn sign_in_rejects_wrong_password_and_unknown_email() {
        let backend = MemoryBackend::new();
        backend.seed_user("ana@example.com", "pw", "Ana", Role::User).unwrap();

        assert!(matches!(
            backend.sign_in("ana@example.com", "nope").await,
            Err(BackendError::InvalidCredentials)
        ));
        assert!(matches!(
            backend.sign_in("who@example.com", "pw").await,
            Err(BackendError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let backend = MemoryBackend::new();
        backend.register("ana@example.com", "pw").await.unwrap();

        let err = backend.register("ANA@example.com", "pw2").await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists { field: "email", .. }));
    }

    #[tokio::test]
    async fn list_clients_is_newest_first_and_limited() {
        let backend = MemoryBackend::new();
        let creator = Uuid::new_v4();
        let base = Utc::now();
        for (i, id) in ["A", "B", "C"].into_iter().enumerate() {
            let draft = ClientDraft {
                identification_number: id.to_string(),
                ..ClientDraft::default()
            };
            backend
                .insert_client(&draft, base + chrono::Duration::seconds(i as i64), creator)
                .await
                .unwrap();
        }

        let ids: Vec<String> = backend
            .list_clients(Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.identification_number)
            .collect();
        assert_eq!(ids, vec!["C", "B"]);
        assert_eq!(backend.count_clients().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn offline_backend_fails_every_call() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            backend.list_clients(None).await,
            Err(BackendError::Unavailable)
        ));
        backend.set_offline(false);
        assert!(backend.list_clients(None).await.unwrap().is_empty());
    }
}
