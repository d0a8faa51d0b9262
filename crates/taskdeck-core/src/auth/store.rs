use std::sync::Arc;

use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, PersistedCredential};
use super::gateway::AuthGateway;
use super::session::{AuthState, Session, UserIdentity};
use super::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    fn fallback_message(&self) -> &'static str {
        match self {
            AuthAction::Login => "Login failed",
            AuthAction::Register => "Registration failed",
        }
    }
}

/// Single source of truth for "is someone signed in, and who".
///
/// Created once at startup in the `Pending` state. It leaves `Pending`
/// only through `initialize`/`finish_initialization`, a successful
/// login/register, or `logout`.
pub struct SessionStore {
    credentials: Arc<dyn CredentialStore>,
    gateway: Arc<dyn AuthGateway>,
    state: AuthState,
}

impl SessionStore {
    pub fn new(credentials: Arc<dyn CredentialStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            credentials,
            gateway,
            state: AuthState::Pending,
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Read the persisted credential and resolve the state. Any previous
    /// state is discarded first, so this also models an application restart.
    pub async fn initialize(&mut self) -> &AuthState {
        self.state = AuthState::Pending;
        let loaded = Self::read_persisted(self.credentials.clone()).await;
        self.finish_initialization(loaded)
    }

    /// The suspending half of `initialize`, runnable away from the store.
    /// Storage failures are logged and read as "no credential".
    pub async fn read_persisted(
        credentials: Arc<dyn CredentialStore>,
    ) -> Option<PersistedCredential> {
        let loaded =
            tokio::task::spawn_blocking(move || PersistedCredential::load(credentials.as_ref()))
                .await;

        match loaded {
            Ok(Ok(credential)) => credential,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read persisted credential");
                None
            }
            Err(e) => {
                warn!(error = %e, "Credential read task failed");
                None
            }
        }
    }

    /// Resolve `Pending` from a credential read by `read_persisted`.
    ///
    /// Ignored once the state is resolved: a login or logout that happened
    /// while the read was in flight wins over the stale read.
    pub fn finish_initialization(&mut self, loaded: Option<PersistedCredential>) -> &AuthState {
        if !self.state.is_pending() {
            debug!("Session already resolved, ignoring persisted credential");
            return &self.state;
        }

        self.state = match loaded {
            Some(credential) => {
                info!(email = %credential.email, "Restored persisted session");
                AuthState::Authenticated(Session::from(credential))
            }
            None => {
                debug!("No persisted session");
                AuthState::Unauthenticated
            }
        };
        &self.state
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(AuthAction::Login, email, password).await
    }

    pub async fn register(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(AuthAction::Register, email, password).await
    }

    async fn authenticate(
        &mut self,
        action: AuthAction,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let result = match action {
            AuthAction::Login => self.gateway.login(email, password).await,
            AuthAction::Register => self.gateway.register(email, password).await,
        };

        let grant = match result {
            Ok(grant) if !grant.token.is_empty() && !grant.email.is_empty() => grant,
            Ok(_) => {
                warn!(?action, "Gateway returned an empty token or email");
                return Err(AuthError::CredentialRejected {
                    message: action.fallback_message().to_string(),
                });
            }
            Err(e) => {
                warn!(?action, email, error = %e, "Authentication failed");
                let message = e
                    .payload_message()
                    .unwrap_or(action.fallback_message())
                    .to_string();
                return Err(AuthError::CredentialRejected { message });
            }
        };

        let credential = PersistedCredential {
            token: grant.token,
            email: grant.email,
        };
        if let Err(e) = credential.save(self.credentials.as_ref()) {
            warn!(error = %e, "Failed to persist credential; session will not survive a restart");
        }

        info!(?action, email = %credential.email, "Signed in");
        self.state = AuthState::Authenticated(Session::from(credential));
        Ok(())
    }

    /// Forget the session locally. Always succeeds; storage errors are logged.
    pub fn logout(&mut self) {
        if let Err(e) = PersistedCredential::clear(self.credentials.as_ref()) {
            warn!(error = %e, "Failed to remove persisted credential");
        }
        if let Some(session) = self.state.session() {
            info!(email = %session.identity.email, "Signed out");
        }
        self.state = AuthState::Unauthenticated;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_initialized(&self) -> bool {
        !self.state.is_pending()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.state.session().map(|s| &s.identity)
    }

    pub fn token(&self) -> Option<&str> {
        self.state.session().map(|s| s.token.as_str())
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        self.credentials.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::{ApiError, ErrorPayload};
    use crate::auth::credentials::{
        MemoryCredentialStore, StoreError, EMAIL_KEY, TOKEN_KEY,
    };
    use crate::auth::gateway::AuthGrant;

    /// Gateway that replays one scripted outcome and counts calls
    struct ScriptedGateway {
        outcome: Mutex<Option<Result<AuthGrant, ApiError>>>,
        calls: AtomicUsize,
        last_call: Mutex<Option<&'static str>>,
    }

    impl ScriptedGateway {
        fn new(outcome: Result<AuthGrant, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(outcome)),
                calls: AtomicUsize::new(0),
                last_call: Mutex::new(None),
            })
        }

        fn granting(token: &str, email: &str) -> Arc<Self> {
            Self::new(Ok(AuthGrant {
                token: token.to_string(),
                email: email.to_string(),
            }))
        }

        fn rejecting(message: Option<&str>) -> Arc<Self> {
            let body = match message {
                Some(m) => format!(r#"{{"message":"{}"}}"#, m),
                None => String::new(),
            };
            Self::new(Err(ApiError::Unauthorized(ErrorPayload::parse(&body))))
        }

        fn next(&self, endpoint: &'static str) -> Result<AuthGrant, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_call.lock().unwrap() = Some(endpoint);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .expect("gateway called more than scripted")
        }
    }

    #[async_trait]
    impl AuthGateway for ScriptedGateway {
        async fn login(&self, _email: &str, _password: &str) -> Result<AuthGrant, ApiError> {
            self.next("login")
        }

        async fn register(&self, _email: &str, _password: &str) -> Result<AuthGrant, ApiError> {
            self.next("register")
        }
    }

    /// Store whose writes and removals always fail
    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::LockPoisoned)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::LockPoisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    /// Keeps values in memory but refuses to write the email key
    #[derive(Default)]
    struct EmailWriteFails {
        inner: MemoryCredentialStore,
    }

    impl CredentialStore for EmailWriteFails {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == EMAIL_KEY {
                return Err(StoreError::LockPoisoned);
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn seeded_store(token: Option<&str>, email: Option<&str>) -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        if let Some(token) = token {
            store.set(TOKEN_KEY, token).unwrap();
        }
        if let Some(email) = email {
            store.set(EMAIL_KEY, email).unwrap();
        }
        store
    }

    fn unused_gateway() -> Arc<ScriptedGateway> {
        ScriptedGateway::rejecting(None)
    }

    #[tokio::test]
    async fn test_starts_pending() {
        let store = SessionStore::new(seeded_store(None, None), unused_gateway());
        assert!(store.state().is_pending());
        assert!(!store.is_initialized());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_initialize_with_both_keys() {
        let mut store = SessionStore::new(
            seeded_store(Some("jwt"), Some("admin@demo.com")),
            unused_gateway(),
        );
        store.initialize().await;

        assert!(store.is_initialized());
        assert!(store.is_authenticated());
        assert_eq!(store.identity().unwrap().email, "admin@demo.com");
        assert_eq!(store.token(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_initialize_with_missing_key() {
        for (token, email) in [(Some("jwt"), None), (None, Some("admin@demo.com")), (None, None)] {
            let mut store = SessionStore::new(seeded_store(token, email), unused_gateway());
            assert_eq!(store.initialize().await, &AuthState::Unauthenticated);
            assert!(!store.is_authenticated());
            assert!(store.is_initialized());
        }
    }

    #[tokio::test]
    async fn test_initialize_with_unreadable_store() {
        let mut store = SessionStore::new(Arc::new(BrokenStore), unused_gateway());
        assert_eq!(store.initialize().await, &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_success_persists_and_authenticates() {
        let credentials = seeded_store(None, None);
        let gateway = ScriptedGateway::granting("jwt-new", "admin@demo.com");
        let mut store = SessionStore::new(credentials.clone(), gateway.clone());
        store.initialize().await;

        assert_eq!(store.login("admin@demo.com", "123456").await, Ok(()));

        assert!(store.is_authenticated());
        assert_eq!(store.identity().unwrap().email, "admin@demo.com");
        assert_eq!(credentials.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-new"));
        assert_eq!(credentials.get(EMAIL_KEY).unwrap().as_deref(), Some("admin@demo.com"));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*gateway.last_call.lock().unwrap(), Some("login"));
    }

    #[tokio::test]
    async fn test_login_uses_email_from_grant() {
        let gateway = ScriptedGateway::granting("jwt", "canonical@demo.com");
        let mut store = SessionStore::new(seeded_store(None, None), gateway);
        store.initialize().await;

        store.login("Canonical@Demo.com", "pw").await.unwrap();
        assert_eq!(store.identity().unwrap().email, "canonical@demo.com");
    }

    #[tokio::test]
    async fn test_login_rejected_with_message() {
        let credentials = seeded_store(None, None);
        let gateway = ScriptedGateway::rejecting(Some("Bad credentials"));
        let mut store = SessionStore::new(credentials.clone(), gateway.clone());
        store.initialize().await;

        let err = store.login("admin@demo.com", "wrong").await.unwrap_err();

        assert_eq!(err.message(), "Bad credentials");
        assert_eq!(store.state(), &AuthState::Unauthenticated);
        assert_eq!(credentials.get(TOKEN_KEY).unwrap(), None);
        // One attempt, no retries
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_without_message_uses_fallback() {
        let mut store =
            SessionStore::new(seeded_store(None, None), ScriptedGateway::rejecting(None));
        store.initialize().await;

        let err = store.login("admin@demo.com", "wrong").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::CredentialRejected {
                message: "Login failed".to_string()
            }
        );
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_existing_session() {
        let mut store = SessionStore::new(
            seeded_store(Some("old"), Some("old@demo.com")),
            ScriptedGateway::rejecting(Some("Bad credentials")),
        );
        store.initialize().await;

        assert!(store.login("other@demo.com", "x").await.is_err());
        assert_eq!(store.identity().unwrap().email, "old@demo.com");
        assert_eq!(store.token(), Some("old"));
    }

    #[tokio::test]
    async fn test_network_failure_uses_fallback() {
        let gateway = ScriptedGateway::new(Err(ApiError::InvalidResponse("eof".to_string())));
        let mut store = SessionStore::new(seeded_store(None, None), gateway);
        store.initialize().await;

        let err = store.register("new@demo.com", "pw").await.unwrap_err();
        assert_eq!(err.message(), "Registration failed");
    }

    #[tokio::test]
    async fn test_register_success() {
        let credentials = seeded_store(None, None);
        let gateway = ScriptedGateway::granting("jwt-reg", "new@demo.com");
        let mut store = SessionStore::new(credentials.clone(), gateway.clone());
        store.initialize().await;

        store.register("new@demo.com", "pw").await.unwrap();

        assert!(store.is_authenticated());
        assert_eq!(*gateway.last_call.lock().unwrap(), Some("register"));
        assert_eq!(credentials.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-reg"));
    }

    #[tokio::test]
    async fn test_register_rejected_with_message() {
        let mut store = SessionStore::new(
            seeded_store(None, None),
            ScriptedGateway::rejecting(Some("Email already registered")),
        );
        store.initialize().await;

        let err = store.register("taken@demo.com", "pw").await.unwrap_err();
        assert_eq!(err.message(), "Email already registered");
    }

    #[tokio::test]
    async fn test_empty_grant_is_rejected() {
        let mut store = SessionStore::new(
            seeded_store(None, None),
            ScriptedGateway::granting("", "a@demo.com"),
        );
        store.initialize().await;

        assert!(store.login("a@demo.com", "pw").await.is_err());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_succeeds_when_persisting_fails() {
        let mut store = SessionStore::new(
            Arc::new(BrokenStore),
            ScriptedGateway::granting("jwt", "a@demo.com"),
        );
        store.initialize().await;

        assert!(store.login("a@demo.com", "pw").await.is_ok());
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_everything_and_is_idempotent() {
        let credentials = seeded_store(Some("jwt"), Some("admin@demo.com"));
        let mut store = SessionStore::new(credentials.clone(), unused_gateway());
        store.initialize().await;
        assert!(store.is_authenticated());

        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(store.identity(), None);
        assert_eq!(credentials.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(credentials.get(EMAIL_KEY).unwrap(), None);

        store.logout();
        assert_eq!(store.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_never_fails_on_broken_store() {
        let mut store = SessionStore::new(Arc::new(BrokenStore), unused_gateway());
        store.logout();
        assert_eq!(store.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_restart_recovers_identity() {
        let credentials = seeded_store(None, None);
        let mut first = SessionStore::new(
            credentials.clone(),
            ScriptedGateway::granting("jwt-1", "admin@demo.com"),
        );
        first.initialize().await;
        first.login("admin@demo.com", "123456").await.unwrap();
        let before = first.state().clone();

        let mut restarted = SessionStore::new(credentials, unused_gateway());
        restarted.initialize().await;

        assert_eq!(restarted.state(), &before);
        assert_eq!(restarted.identity().unwrap().email, "admin@demo.com");
    }

    #[tokio::test]
    async fn test_stale_read_does_not_override_logout() {
        let credentials = seeded_store(Some("jwt"), Some("admin@demo.com"));
        let mut store = SessionStore::new(credentials.clone(), unused_gateway());

        let loaded = SessionStore::read_persisted(store.credentials()).await;
        assert!(loaded.is_some());

        store.logout();
        store.finish_initialization(loaded);
        assert_eq!(store.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_stale_read_does_not_override_login() {
        let mut store = SessionStore::new(
            seeded_store(None, None),
            ScriptedGateway::granting("jwt", "fresh@demo.com"),
        );
        store.login("fresh@demo.com", "pw").await.unwrap();
        store.finish_initialization(None);
        assert_eq!(store.identity().unwrap().email, "fresh@demo.com");
    }

    #[tokio::test]
    async fn test_half_written_login_does_not_restore_previous_identity() {
        let credentials = Arc::new(EmailWriteFails::default());
        credentials.inner.set(TOKEN_KEY, "token-a").unwrap();
        credentials.inner.set(EMAIL_KEY, "a@demo.com").unwrap();

        let mut store = SessionStore::new(
            credentials.clone(),
            ScriptedGateway::granting("token-b", "b@demo.com"),
        );
        store.initialize().await;
        assert_eq!(store.identity().unwrap().email, "a@demo.com");

        store.login("b@demo.com", "pw").await.unwrap();
        assert_eq!(store.identity().unwrap().email, "b@demo.com");
        assert_eq!(store.token(), Some("token-b"));

        let mut restarted = SessionStore::new(credentials, unused_gateway());
        restarted.initialize().await;
        assert_eq!(restarted.state(), &AuthState::Unauthenticated);
        assert_eq!(restarted.token(), None);
    }
}
