//! Session manager
//!
//! State lives in a `watch` channel so front ends can observe it; the persisted copy is
//! two keys in the [`KeyValueStore`]. A session is authenticated only when both the user
//! record and the credential are present.
//!
//! Shutdown: [`SessionManager::shutdown`] stops the auth event listener. It is also
//! called on drop; the listener only holds a weak reference to the manager.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use fooddash_core::models::{LoginRequest, RegisterRequest, Session, SessionState, User};
use fooddash_core::{
    AppError, AuthApi, AuthEvent, AuthEventReceiver, CredentialProvider, Notifier, Route, Router,
    Toast,
};
use fooddash_storage::{KeyValueStore, TOKEN_KEY, USER_KEY};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LOGIN_ERROR: &str = "Invalid email or password";
pub const DEFAULT_REGISTER_ERROR: &str = "Registration failed";

pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    store: Arc<dyn KeyValueStore>,
    router: Arc<dyn Router>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    in_flight: AtomicUsize,
    shutdown: CancellationToken,
}

/// Keeps `is_loading` raised while at least one exchange is running.
struct LoadingGuard<'a> {
    manager: &'a SessionManager,
}

impl<'a> LoadingGuard<'a> {
    fn begin(manager: &'a SessionManager) -> Self {
        if manager.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            manager.state.send_modify(|state| state.is_loading = true);
        }
        Self { manager }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.manager.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.manager
                .state
                .send_modify(|state| state.is_loading = false);
        }
    }
}

impl SessionManager {
    /// Create a manager whose initial state is rehydrated from `store`.
    ///
    /// No request is made: a stored credential is trusted until the API rejects it.
    pub async fn new(
        auth: Arc<dyn AuthApi>,
        store: Arc<dyn KeyValueStore>,
        router: Arc<dyn Router>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let session = rehydrate(store.as_ref()).await;
        match &session {
            Some(session) => {
                tracing::info!(user_id = session.user.id, "Restored stored session")
            }
            None => tracing::debug!("No stored session"),
        }

        let (state, _) = watch::channel(SessionState {
            session,
            is_loading: false,
        });

        Arc::new(Self {
            auth,
            store,
            router,
            notifier,
            state,
            in_flight: AtomicUsize::new(0),
            shutdown: CancellationToken::new(),
        })
    }

    /// Create a manager and start consuming `events`.
    pub async fn start(
        auth: Arc<dyn AuthApi>,
        store: Arc<dyn KeyValueStore>,
        router: Arc<dyn Router>,
        notifier: Arc<dyn Notifier>,
        events: AuthEventReceiver,
    ) -> Arc<Self> {
        let manager = Self::new(auth, store, router, notifier).await;
        manager.listen(events);
        manager
    }

    /// Spawn the listener that reacts to rejected credentials.
    ///
    /// The receiver is not `Clone`, so there is exactly one consumer per channel.
    pub fn listen(self: &Arc<Self>, mut events: AuthEventReceiver) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let shutdown = self.shutdown.child_token();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let Some(manager) = manager.upgrade() else { break };
                        match event {
                            AuthEvent::CredentialRejected { path } => {
                                manager.expire(&path).await;
                            }
                        }
                    }
                }
            }
            tracing::debug!("Auth event listener stopped");
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AppError> {
        let _loading = LoadingGuard::begin(self);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.auth.login(&request).await {
            Ok(response) => {
                tracing::info!(email, "Logged in");
                self.establish(Session::from(response)).await;
                Ok(())
            }
            Err(err) => {
                tracing::info!(email, error = %err, "Login failed");
                Err(AppError::from_auth_failure(&err, DEFAULT_LOGIN_ERROR))
            }
        }
    }

    /// Register a customer account and log it in.
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<(), AppError> {
        let _loading = LoadingGuard::begin(self);
        let request = RegisterRequest::customer(first_name, last_name, email, password, phone);

        match self.auth.register(&request).await {
            Ok(response) => {
                tracing::info!(email, "Registered");
                self.establish(Session::from(response)).await;
                Ok(())
            }
            Err(err) => {
                tracing::info!(email, error = %err, "Registration failed");
                Err(AppError::from_auth_failure(&err, DEFAULT_REGISTER_ERROR))
            }
        }
    }

    /// Forget the session in memory and in storage. Never fails.
    pub async fn logout(&self) {
        self.clear().await;
        tracing::info!("Logged out");
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Guard for protected operations. Sends the user to the login route when there is
    /// no session.
    pub fn require_authenticated(&self) -> Result<Session, AppError> {
        let session = self.state.borrow().session.clone();
        match session {
            Some(session) => Ok(session),
            None => {
                self.router.navigate(Route::Login);
                Err(AppError::Unauthenticated)
            }
        }
    }

    /// Credential source for the transport, always reflecting the current session.
    pub fn credentials(&self) -> Arc<SessionCredentials> {
        Arc::new(SessionCredentials {
            state: self.state.subscribe(),
        })
    }

    /// Stop the auth event listener. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn establish(&self, session: Session) {
        if let Err(e) = self.persist(&session).await {
            tracing::warn!(error = %e, "Failed to persist session; it will not survive a restart");
            self.purge_storage().await;
        }
        self.state.send_modify(|state| state.session = Some(session));
    }

    async fn persist(&self, session: &Session) -> Result<(), AppError> {
        let user = serde_json::to_string(&session.user)?;
        self.store.set(USER_KEY, &user).await?;
        self.store.set(TOKEN_KEY, &session.token).await?;
        Ok(())
    }

    async fn clear(&self) {
        self.state.send_modify(|state| state.session = None);
        self.purge_storage().await;
    }

    async fn purge_storage(&self) {
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key, error = %e, "Failed to remove stored session key");
            }
        }
    }

    async fn expire(&self, path: &str) {
        let had_session = self.is_authenticated();
        tracing::warn!(path, "Credential rejected, clearing session");
        self.clear().await;

        // Concurrent 401s arrive as separate events; only the first one has a session.
        if had_session {
            self.notifier.notify(Toast::warning(
                "Session expired",
                "Please log in again to continue.",
            ));
        }
        self.router.navigate(Route::Login);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Bearer credential backed by the manager's state channel.
pub struct SessionCredentials {
    state: watch::Receiver<SessionState>,
}

impl CredentialProvider for SessionCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }
}

async fn read_key(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read stored session key");
            None
        }
    }
}

/// Load the stored session. Anything short of a complete, parseable pair is purged.
async fn rehydrate(store: &dyn KeyValueStore) -> Option<Session> {
    let raw_user = read_key(store, USER_KEY).await;
    let raw_token = read_key(store, TOKEN_KEY).await;
    let had_any = raw_user.is_some() || raw_token.is_some();

    let user = raw_user.and_then(|raw| match serde_json::from_str::<User>(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Stored user record is malformed");
            None
        }
    });
    let token = raw_token.filter(|token| !token.trim().is_empty());

    if let (Some(user), Some(token)) = (user, token) {
        return Some(Session { user, token });
    }

    if had_any {
        tracing::info!("Discarding incomplete stored session");
    }
    for key in [USER_KEY, TOKEN_KEY] {
        if let Err(e) = store.remove(key).await {
            tracing::warn!(key, error = %e, "Failed to purge stored session key");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fooddash_core::models::Role;

    #[test]
    fn test_credentials_follow_state() {
        let (tx, rx) = watch::channel(SessionState::default());
        let credentials = SessionCredentials { state: rx };
        assert_eq!(credentials.bearer_token(), None);

        tx.send_modify(|state| {
            state.session = Some(Session {
                user: User {
                    id: 1,
                    email: "a@b.com".to_string(),
                    first_name: "A".to_string(),
                    last_name: "B".to_string(),
                    role: Role::Customer,
                    avatar: None,
                },
                token: "tok123".to_string(),
            })
        });
        assert_eq!(credentials.bearer_token().as_deref(), Some("tok123"));

        tx.send_modify(|state| state.session = None);
        assert_eq!(credentials.bearer_token(), None);
    }
}
