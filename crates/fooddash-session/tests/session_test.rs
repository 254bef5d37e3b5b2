use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fooddash_core::models::{AuthResponse, LoginRequest, RegisterRequest, Role};
use fooddash_core::{
    auth_event_channel, AppError, AuthApi, AuthEvent, CredentialProvider, Notifier, Route, Router,
    Severity, Toast, TransportError,
};
use fooddash_session::{SessionManager, DEFAULT_LOGIN_ERROR};
use fooddash_storage::{
    FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult, TOKEN_KEY, USER_KEY,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

fn auth_response(token: &str) -> AuthResponse {
    AuthResponse {
        token: token.to_string(),
        id: 1,
        email: "a@b.com".to_string(),
        first_name: "A".to_string(),
        last_name: "B".to_string(),
        role: Role::Customer,
    }
}

/// Auth API stub answering every call with a fixed outcome.
struct StubAuth {
    outcome: Mutex<Result<AuthResponse, TransportError>>,
    registrations: Mutex<Vec<RegisterRequest>>,
    gate: Option<Arc<Notify>>,
}

impl StubAuth {
    fn succeeding(token: &str) -> Self {
        Self::with_outcome(Ok(auth_response(token)))
    }

    fn failing(err: TransportError) -> Self {
        Self::with_outcome(Err(err))
    }

    fn with_outcome(outcome: Result<AuthResponse, TransportError>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            registrations: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn answer(&self) -> Result<AuthResponse, TransportError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.lock().clone()
    }
}

#[async_trait]
impl AuthApi for StubAuth {
    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, TransportError> {
        self.answer().await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, TransportError> {
        self.registrations.lock().push(request.clone());
        self.answer().await
    }
}

#[derive(Default)]
struct RecordingRouter {
    routes: Mutex<Vec<Route>>,
}

impl Router for RecordingRouter {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

#[derive(Default)]
struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

/// Store whose writes always fail.
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::WriteFailed("disk full".to_string()))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key).await
    }
}

struct Harness {
    manager: Arc<SessionManager>,
    store: Arc<MemoryStore>,
    router: Arc<RecordingRouter>,
    notifier: Arc<RecordingNotifier>,
}

async fn harness(auth: StubAuth, store: Arc<MemoryStore>) -> Harness {
    let router = Arc::new(RecordingRouter::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = SessionManager::new(
        Arc::new(auth),
        store.clone(),
        router.clone(),
        notifier.clone(),
    )
    .await;
    Harness {
        manager,
        store,
        router,
        notifier,
    }
}

#[tokio::test]
async fn test_login_success_persists_session() {
    let h = harness(StubAuth::succeeding("tok123"), Arc::new(MemoryStore::new())).await;

    h.manager.login("a@b.com", "secret").await.unwrap();

    let state = h.manager.current();
    assert!(state.is_authenticated());
    assert!(!state.is_loading);
    assert_eq!(state.token(), Some("tok123"));
    assert_eq!(state.user().map(|u| u.email.as_str()), Some("a@b.com"));

    let entries = h.store.entries();
    assert_eq!(entries.get(TOKEN_KEY).map(String::as_str), Some("tok123"));
    let stored_user: serde_json::Value =
        serde_json::from_str(entries.get(USER_KEY).unwrap()).unwrap();
    assert_eq!(stored_user["email"], "a@b.com");
    assert_eq!(stored_user["role"], "CUSTOMER");
}

#[tokio::test]
async fn test_rejected_login_leaves_state_unchanged() {
    let h = harness(
        StubAuth::failing(TransportError::Status {
            status: 401,
            message: Some("Bad credentials".to_string()),
        }),
        Arc::new(MemoryStore::new()),
    )
    .await;
    let before = h.manager.current();

    let err = h.manager.login("a@b.com", "wrong").await.unwrap_err();

    match err {
        AppError::Authentication(message) => assert_eq!(message, "Bad credentials"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.manager.current(), before);
    assert!(h.store.entries().is_empty());
    assert!(h.router.routes.lock().is_empty());
}

#[tokio::test]
async fn test_login_failure_without_message_uses_default() {
    let h = harness(
        StubAuth::failing(TransportError::Network("connection refused".to_string())),
        Arc::new(MemoryStore::new()),
    )
    .await;

    let err = h.manager.login("a@b.com", "secret").await.unwrap_err();
    assert!(matches!(err, AppError::Authentication(ref m) if m == DEFAULT_LOGIN_ERROR));
    assert!(!h.manager.current().is_loading);
}

#[tokio::test]
async fn test_register_creates_customer_session() {
    let auth = StubAuth::succeeding("tok456");
    let h = harness(auth, Arc::new(MemoryStore::new())).await;

    h.manager
        .register("A", "B", "a@b.com", "secret", "555-0100")
        .await
        .unwrap();

    assert_eq!(h.manager.current().token(), Some("tok456"));
    assert_eq!(
        h.store.entries().get(TOKEN_KEY).map(String::as_str),
        Some("tok456")
    );
}

#[tokio::test]
async fn test_register_failure_reports_server_message() {
    let auth = Arc::new(StubAuth::failing(TransportError::Status {
        status: 400,
        message: Some("Email already exists".to_string()),
    }));
    let manager = SessionManager::new(
        auth.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingRouter::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;

    let err = manager
        .register("A", "B", "a@b.com", "secret", "555-0100")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Authentication(ref m) if m == "Email already exists"));
    let registrations = auth.registrations.lock();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].role, Role::Customer);
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_logout_then_restart_is_unauthenticated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = Arc::new(FileStore::open(&path).await.unwrap());
    let manager = SessionManager::new(
        Arc::new(StubAuth::succeeding("tok123")),
        store,
        Arc::new(RecordingRouter::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;
    manager.login("a@b.com", "secret").await.unwrap();
    drop(manager);

    // A fresh start restores the stored session.
    let store = Arc::new(FileStore::open(&path).await.unwrap());
    let manager = SessionManager::new(
        Arc::new(StubAuth::succeeding("unused")),
        store.clone(),
        Arc::new(RecordingRouter::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;
    assert_eq!(manager.current().token(), Some("tok123"));

    manager.logout().await;
    assert!(!manager.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    assert_eq!(store.get(USER_KEY).await.unwrap(), None);
    drop(manager);

    let store = Arc::new(FileStore::open(&path).await.unwrap());
    let manager = SessionManager::new(
        Arc::new(StubAuth::succeeding("unused")),
        store,
        Arc::new(RecordingRouter::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_partial_stored_session_is_purged() {
    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "orphan").await.unwrap();

    let h = harness(StubAuth::succeeding("unused"), store).await;

    assert!(!h.manager.is_authenticated());
    assert!(h.store.entries().is_empty());
}

#[tokio::test]
async fn test_malformed_stored_user_is_purged() {
    let store = Arc::new(MemoryStore::new());
    store.set(USER_KEY, "{not json").await.unwrap();
    store.set(TOKEN_KEY, "tok123").await.unwrap();

    let h = harness(StubAuth::succeeding("unused"), store).await;

    assert!(!h.manager.is_authenticated());
    assert!(h.store.entries().is_empty());
}

#[tokio::test]
async fn test_rejected_credential_clears_session_and_redirects() {
    let (events_tx, events_rx) = auth_event_channel();
    let store = Arc::new(MemoryStore::new());
    let router = Arc::new(RecordingRouter::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = SessionManager::start(
        Arc::new(StubAuth::succeeding("tok123")),
        store.clone(),
        router.clone(),
        notifier.clone(),
        events_rx,
    )
    .await;
    manager.login("a@b.com", "secret").await.unwrap();
    let mut state = manager.subscribe();

    events_tx.emit(AuthEvent::CredentialRejected {
        path: "/orders/my-orders".to_string(),
    });

    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| !s.is_authenticated()),
    )
    .await
    .unwrap()
    .unwrap();

    // The redirect follows the storage purge; give the listener a moment to finish.
    tokio::time::timeout(Duration::from_secs(2), async {
        while router.routes.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(router.routes.lock().as_slice(), &[Route::Login]);
    assert!(store.entries().is_empty());
    let toasts = notifier.toasts.lock();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Session expired");
    assert_eq!(toasts[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_loading_flag_spans_exchange() {
    let gate = Arc::new(Notify::new());
    let h = harness(
        StubAuth::failing(TransportError::Status {
            status: 401,
            message: None,
        })
        .gated(gate.clone()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    let mut state = h.manager.subscribe();

    let manager = h.manager.clone();
    let login = tokio::spawn(async move { manager.login("a@b.com", "wrong").await });

    tokio::time::timeout(Duration::from_secs(2), state.wait_for(|s| s.is_loading))
        .await
        .unwrap()
        .unwrap();

    gate.notify_one();
    assert!(login.await.unwrap().is_err());
    assert!(!h.manager.current().is_loading);
}

#[tokio::test]
async fn test_guard_redirects_when_unauthenticated() {
    let h = harness(StubAuth::succeeding("tok123"), Arc::new(MemoryStore::new())).await;

    assert!(matches!(
        h.manager.require_authenticated(),
        Err(AppError::Unauthenticated)
    ));
    assert_eq!(h.router.routes.lock().as_slice(), &[Route::Login]);

    h.manager.login("a@b.com", "secret").await.unwrap();
    let session = h.manager.require_authenticated().unwrap();
    assert_eq!(session.token, "tok123");
    assert_eq!(h.router.routes.lock().len(), 1);
    assert!(h.notifier.toasts.lock().is_empty());
}

#[tokio::test]
async fn test_credentials_track_login_and_logout() {
    let h = harness(StubAuth::succeeding("tok123"), Arc::new(MemoryStore::new())).await;
    let credentials = h.manager.credentials();
    assert_eq!(credentials.bearer_token(), None);

    h.manager.login("a@b.com", "secret").await.unwrap();
    assert_eq!(credentials.bearer_token().as_deref(), Some("tok123"));

    h.manager.logout().await;
    assert_eq!(credentials.bearer_token(), None);
}

#[tokio::test]
async fn test_persistence_failure_keeps_in_memory_session() {
    let manager = SessionManager::new(
        Arc::new(StubAuth::succeeding("tok123")),
        Arc::new(ReadOnlyStore::default()),
        Arc::new(RecordingRouter::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .await;

    manager.login("a@b.com", "secret").await.unwrap();
    assert_eq!(manager.current().token(), Some("tok123"));
}
