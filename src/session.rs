//! The session store: the one place that knows who is signed in.
//!
//! It listens to the auth provider's notifications and turns each principal
//! into an [`Identity`] by loading the matching profile. Screens never read
//! the provider directly; they receive a [`SessionState`] snapshot.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::backend::{AuthNotification, AuthProvider, AuthSubscription, BackendError, ProfileStore};
use crate::models::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl SessionState {
    fn starting() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }
}

pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    subscription: Option<AuthSubscription>,
    state: SessionState,
}

impl SessionStore {
    /// Subscribe to the provider. The store stays loading until the first
    /// notification has been applied.
    pub fn start(auth: Arc<dyn AuthProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        let subscription = auth.subscribe();
        Self {
            auth,
            profiles,
            subscription: Some(subscription),
            state: SessionState::starting(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.state.identity.as_ref()
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Apply a pending notification, if any. Returns true when the state changed.
    pub async fn sync(&mut self) -> bool {
        let pending = self.subscription.as_mut().and_then(AuthSubscription::poll);
        match pending {
            Some(notification) => self.apply(notification).await,
            None => false,
        }
    }

    /// Wait for the next notification and apply it. Returns false when the
    /// provider has gone away or the store was torn down.
    #[cfg(test)]
    pub async fn next_notification(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(notification) => {
                self.apply(notification).await;
                true
            }
            None => false,
        }
    }

    async fn apply(&mut self, notification: AuthNotification) -> bool {
        let previous = self.state.clone();

        match notification {
            Some(principal) => match self.profiles.get_profile(principal.id).await {
                Ok(Some(identity)) => {
                    info!(user = %identity.id, role = %identity.role, "session established");
                    self.state.identity = Some(identity);
                }
                Ok(None) => {
                    // No profile yet for this account. The session stays
                    // anonymous without telling the user why.
                    warn!(
                        principal = %principal.id,
                        email = %principal.email,
                        "signed-in principal has no profile record"
                    );
                    self.state.identity = None;
                }
                Err(err) => {
                    error!(principal = %principal.id, error = %err, "profile lookup failed");
                }
            },
            None => {
                debug!("no signed-in principal");
                self.state.identity = None;
            }
        }

        self.state.loading = false;
        self.state != previous
    }

    /// Clear the local identity and end the provider session.
    pub async fn sign_out(&mut self) -> Result<(), BackendError> {
        self.state.identity = None;
        self.auth.sign_out().await?;
        info!("signed out");
        Ok(())
    }

    /// Detach from the provider.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!("session listener detached");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::models::Role;
    use pretty_assertions::assert_eq;

    fn store(backend: &Arc<MemoryBackend>) -> SessionStore {
        SessionStore::start(backend.clone(), backend.clone())
    }

    #[tokio::test]
    async fn starts_loading_then_resolves_to_anonymous() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = store(&backend);
        assert_eq!(session.state(), &SessionState { identity: None, loading: true });

        assert!(session.sync().await);
        assert_eq!(session.state(), &SessionState { identity: None, loading: false });
        assert!(!session.sync().await);
    }

    #[tokio::test]
    async fn principal_with_profile_becomes_identity() {
        let backend = Arc::new(MemoryBackend::new());
        let ana = backend.seed_user("ana@example.com", "pw", "Ana", Role::User).unwrap();
        let mut session = store(&backend);
        session.sync().await;

        backend.sign_in("ana@example.com", "pw").await.unwrap();
        assert!(session.sync().await);
        assert_eq!(session.identity(), Some(&ana));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn principal_without_profile_stays_anonymous() {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("ghost@example.com", "pw").await.unwrap();

        let mut session = store(&backend);
        session.sync().await;
        assert_eq!(session.state(), &SessionState { identity: None, loading: false });
    }

    #[tokio::test]
    async fn profile_lookup_failure_keeps_prior_identity() {
        let backend = Arc::new(MemoryBackend::new());
        let ana = backend.seed_user("ana@example.com", "pw", "Ana", Role::User).unwrap();
        backend.sign_in("ana@example.com", "pw").await.unwrap();
        let mut session = store(&backend);
        session.sync().await;
        assert_eq!(session.identity(), Some(&ana));

        backend.set_offline(true);
        session.apply(Some(crate::models::Principal {
            id: ana.id,
            email: ana.email.clone(),
        }))
        .await;
        assert_eq!(session.identity(), Some(&ana));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn sign_out_clears_identity_and_notifies_provider() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_user("sup@example.com", "pw", "Sup", Role::Supervisor).unwrap();
        backend.sign_in("sup@example.com", "pw").await.unwrap();
        let mut session = store(&backend);
        session.sync().await;
        assert!(session.identity().is_some());

        let mut observer = backend.subscribe();
        observer.poll();

        session.sign_out().await.unwrap();
        assert_eq!(session.identity(), None);
        assert_eq!(observer.poll(), Some(None));
    }

    #[tokio::test]
    async fn next_notification_waits_for_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let ana = backend.seed_user("ana@example.com", "pw", "Ana", Role::Admin).unwrap();
        let mut session = store(&backend);
        assert!(session.next_notification().await);
        assert_eq!(session.identity(), None);

        let provider = backend.clone();
        tokio::spawn(async move { provider.sign_in("ana@example.com", "pw").await });
        assert!(session.next_notification().await);
        assert_eq!(session.identity(), Some(&ana));
    }

    #[tokio::test]
    async fn teardown_detaches_listener() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = store(&backend);
        assert_eq!(backend.listener_count(), 1);

        session.teardown();
        assert_eq!(backend.listener_count(), 0);
        assert!(!session.next_notification().await);

        let dropped = store(&backend);
        assert_eq!(backend.listener_count(), 1);
        drop(dropped);
        assert_eq!(backend.listener_count(), 0);
    }
}
