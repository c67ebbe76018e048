use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use payloads::Role;
use payloads::requests;
use payloads::responses::{self, UserProfile};

use crate::api_client::{APIClient, ClientError};
use crate::storage::{AUTH_TOKEN_KEY, AUTH_USER_KEY, StorageBackend};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Reading persisted state; nothing is known yet.
    Bootstrapping,
    Unauthenticated,
    /// A persisted token is being confirmed against the server. The cached
    /// identity, if any, is already visible.
    Verifying,
    Authenticated,
    /// Verification rejected the persisted token; the session is being
    /// cleared.
    Failed,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub identity: Option<UserProfile>,
    pub status: SessionStatus,
}

struct SessionInner {
    token: Option<String>,
    identity: Option<UserProfile>,
    status: SessionStatus,
    listeners: Vec<(usize, Rc<dyn Fn()>)>,
    next_listener_id: usize,
}

/// Owns the authentication lifecycle: bootstrap from durable storage,
/// optimistic render of the cached identity while the server confirms it,
/// and the login/register/logout/update operations.
///
/// Token and identity are written together inside a single borrow, so no
/// synchronous reader ever observes one without the other after a completed
/// transition. Verification failures of any kind log the session out rather
/// than retrying, to avoid a stuck phantom-authenticated state.
pub struct SessionManager {
    client: APIClient,
    storage: Arc<dyn StorageBackend>,
    inner: Rc<RefCell<SessionInner>>,
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            storage: self.storage.clone(),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl SessionManager {
    pub fn new(client: APIClient, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            client,
            storage,
            inner: Rc::new(RefCell::new(SessionInner {
                token: None,
                identity: None,
                status: SessionStatus::Bootstrapping,
                listeners: Vec::new(),
                next_listener_id: 0,
            })),
        }
    }

    /// The transport client carrying this session's credential.
    pub fn client(&self) -> &APIClient {
        &self.client
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.borrow();
        SessionSnapshot {
            token: inner.token.clone(),
            identity: inner.identity.clone(),
            status: inner.status,
        }
    }

    /// True whenever an identity is visible, including the optimistic one
    /// rendered while verification is still in flight.
    pub fn is_authenticated(&self) -> bool {
        self.inner.borrow().identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner
            .borrow()
            .identity
            .as_ref()
            .map(|identity| identity.role)
    }

    pub fn is_student(&self) -> bool {
        self.role() == Some(Role::Student)
    }

    pub fn is_teacher(&self) -> bool {
        self.role() == Some(Role::Teacher)
    }

    pub fn is_parent(&self) -> bool {
        self.role() == Some(Role::Parent)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Register a listener invoked after every completed transition.
    /// Returns an id for `unsubscribe`.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> usize {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: usize) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Restore a persisted session.
    ///
    /// With no stored token the session is simply unauthenticated. With
    /// one, the cached identity is rendered immediately and the token is
    /// confirmed against the server; any failure there - expired token,
    /// network error - clears the whole session instead of retrying.
    pub async fn bootstrap(&self) {
        let Some(token) = self.storage.get(AUTH_TOKEN_KEY) else {
            self.transition(|inner| {
                inner.status = SessionStatus::Unauthenticated;
            });
            return;
        };

        self.client.set_token(Some(&token));
        let cached = self
            .storage
            .get(AUTH_USER_KEY)
            .and_then(|raw| serde_json::from_str::<UserProfile>(&raw).ok());
        self.transition(move |inner| {
            inner.token = Some(token);
            inner.identity = cached;
            inner.status = SessionStatus::Verifying;
        });

        match self.client.current_user().await {
            Ok(identity) => {
                self.persist_identity(&identity);
                self.transition(move |inner| {
                    inner.identity = Some(identity);
                    inner.status = SessionStatus::Authenticated;
                });
            }
            Err(error) => {
                tracing::info!("session verification failed: {error}");
                self.transition(|inner| {
                    inner.status = SessionStatus::Failed;
                });
                self.clear_session();
            }
        }
    }

    /// Exchange credentials for a fresh session. Prior session state is
    /// untouched when the call fails.
    pub async fn login(
        &self,
        credentials: &requests::LoginCredentials,
    ) -> Result<UserProfile, ClientError> {
        let auth = self.client.login(credentials).await?;
        Ok(self.install_session(auth))
    }

    /// Create an account and establish a session for it. Same contract as
    /// `login`.
    pub async fn register(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<UserProfile, ClientError> {
        let auth = self.client.create_account(details).await?;
        Ok(self.install_session(auth))
    }

    /// Invalidate the session server-side when a token is held (failure is
    /// logged, not propagated), then always clear local state. Safe to call
    /// when already unauthenticated.
    pub async fn logout(&self) {
        let has_token = self.inner.borrow().token.is_some();
        if has_token && let Err(error) = self.client.logout().await {
            tracing::warn!("server-side logout failed: {error}");
        }
        self.clear_session();
    }

    /// Merge a partial profile edit into the cached identity without a
    /// round trip, e.g. after a separately-confirmed profile mutation.
    /// A no-op when no identity is held.
    pub fn update_identity(&self, patch: &requests::UpdateProfile) {
        let updated = {
            let mut inner = self.inner.borrow_mut();
            let Some(identity) = inner.identity.as_mut() else {
                return;
            };
            if let Some(username) = &patch.username {
                identity.username = username.clone();
            }
            if let Some(email) = &patch.email {
                identity.email = email.clone();
            }
            identity.clone()
        };
        self.persist_identity(&updated);
        self.notify_listeners();
    }

    fn install_session(&self, auth: responses::AuthResponse) -> UserProfile {
        let responses::AuthResponse { token, user } = auth;
        self.client.set_token(Some(&token));
        self.persist_identity(&user);
        let installed = user.clone();
        self.transition(move |inner| {
            inner.token = Some(token);
            inner.identity = Some(user);
            inner.status = SessionStatus::Authenticated;
        });
        installed
    }

    /// Drop the credential and identity together, locally and in storage.
    fn clear_session(&self) {
        self.client.set_token(None);
        self.storage.remove(AUTH_USER_KEY);
        self.transition(|inner| {
            inner.token = None;
            inner.identity = None;
            inner.status = SessionStatus::Unauthenticated;
        });
    }

    fn persist_identity(&self, identity: &UserProfile) {
        if let Ok(raw) = serde_json::to_string(identity) {
            self.storage.set(AUTH_USER_KEY, &raw);
        }
    }

    fn transition(&self, apply: impl FnOnce(&mut SessionInner)) {
        apply(&mut self.inner.borrow_mut());
        self.notify_listeners();
    }

    fn notify_listeners(&self) {
        // drop the borrow before invoking listeners, which may read state
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn bootstrap_without_token_is_unauthenticated() {
        let storage: Arc<dyn StorageBackend> =
            Arc::new(MemoryStorage::default());
        let client = APIClient::new("http://127.0.0.1:9", storage.clone());
        let session = SessionManager::new(client, storage);

        assert_eq!(session.snapshot().status, SessionStatus::Bootstrapping);
        session.bootstrap().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert_eq!(snapshot.token, None);
        assert_eq!(snapshot.identity, None);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn unreachable_server_fails_closed() {
        // port 9 (discard) refuses connections, so verification errors out
        let storage = MemoryStorage::default();
        storage.set(AUTH_TOKEN_KEY, "abc");
        storage.set(AUTH_USER_KEY, "not json");
        let shared: Arc<dyn StorageBackend> = Arc::new(storage.clone());
        let client = APIClient::new("http://127.0.0.1:9", shared.clone());
        let session = SessionManager::new(client, shared);

        session.bootstrap().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert_eq!(snapshot.token, None);
        assert_eq!(snapshot.identity, None);
        assert_eq!(storage.get(AUTH_TOKEN_KEY), None);
        assert_eq!(storage.get(AUTH_USER_KEY), None);
    }

    #[tokio::test]
    async fn unsubscribed_listeners_stop_firing() {
        let storage: Arc<dyn StorageBackend> =
            Arc::new(MemoryStorage::default());
        let client = APIClient::new("http://127.0.0.1:9", storage.clone());
        let session = SessionManager::new(client, storage);

        let calls = Rc::new(std::cell::Cell::new(0));
        let seen = calls.clone();
        let id = session.subscribe(move || seen.set(seen.get() + 1));

        session.bootstrap().await;
        let after_bootstrap = calls.get();
        assert!(after_bootstrap > 0);

        session.unsubscribe(id);
        session.bootstrap().await;
        assert_eq!(calls.get(), after_bootstrap);
    }
}
