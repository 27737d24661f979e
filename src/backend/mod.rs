//! Interfaces to the services the application delegates to: an auth provider
//! that pushes sign-in state changes, and record stores for profiles and
//! clients. `crate::db::Database` implements them on PostgreSQL and
//! [`memory::MemoryBackend`] implements them in-process.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::{Client, ClientDraft, Identity, Principal};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} already exists with {field} = '{value}'")]
    AlreadyExists {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("stored record is invalid: {0}")]
    InvalidRecord(String),

    #[error("backend unavailable")]
    Unavailable,
}

impl From<argon2::password_hash::Error> for BackendError {
    fn from(err: argon2::password_hash::Error) -> Self {
        BackendError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Value carried by an auth notification: the signed-in principal, or none.
pub type AuthNotification = Option<Principal>;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a listener. The first read delivers the current state.
    fn subscribe(&self) -> AuthSubscription;

    /// Number of live subscriptions.
    fn listener_count(&self) -> usize;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal>;

    /// Create an account and sign it in.
    async fn register(&self, email: &str, password: &str) -> Result<Principal>;

    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn insert_profile(&self, identity: &Identity) -> Result<()>;
    async fn list_profiles(&self) -> Result<Vec<Identity>>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Clients ordered by `created_at`, newest first.
    async fn list_clients(&self, limit: Option<i64>) -> Result<Vec<Client>>;

    /// Exact, case-sensitive lookup.
    async fn find_by_identification(&self, identification_number: &str) -> Result<Option<Client>>;

    async fn insert_client(
        &self,
        draft: &ClientDraft,
        created_at: DateTime<Utc>,
        created_by: Uuid,
    ) -> Result<Client>;

    /// Removing an id that does not exist is not an error.
    async fn delete_client(&self, id: Uuid) -> Result<()>;

    async fn count_clients(&self) -> Result<i64>;
}

/// Publishing side of the auth state channel, owned by a provider.
pub struct PrincipalFeed {
    tx: watch::Sender<AuthNotification>,
}

impl PrincipalFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, principal: AuthNotification) {
        self.tx.send_replace(principal);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.tx.subscribe())
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PrincipalFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered auth listener. Dropping it (or calling
/// [`AuthSubscription::unsubscribe`]) detaches it from the provider.
pub struct AuthSubscription {
    rx: watch::Receiver<AuthNotification>,
    initial_delivered: bool,
}

impl AuthSubscription {
    fn new(rx: watch::Receiver<AuthNotification>) -> Self {
        Self {
            rx,
            initial_delivered: false,
        }
    }

    /// Take a pending notification without waiting.
    pub fn poll(&mut self) -> Option<AuthNotification> {
        if !self.initial_delivered {
            self.initial_delivered = true;
            return Some(self.rx.borrow_and_update().clone());
        }

        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Wait for the next notification. `None` once the provider is gone.
    #[cfg(test)]
    pub async fn next(&mut self) -> Option<AuthNotification> {
        if let Some(notification) = self.poll() {
            return Some(notification);
        }

        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}

/// Backend handles created at the application root and passed down.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub clients: Arc<dyn ClientStore>,
}

impl Services {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthProvider + ProfileStore + ClientStore + 'static,
    {
        Self {
            auth: backend.clone(),
            profiles: backend.clone(),
            clients: backend,
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
