//! Authentication against Supabase GoTrue

mod session;
mod store;
mod types;

use reqwest::Client;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex, OnceCell};
use tokio::task::JoinHandle;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use session::*;
pub use store::*;
pub use types::*;

/// How often the auto refresh task looks at the session
pub const AUTO_REFRESH_TICK: Duration = Duration::from_secs(30);

/// Sessions expiring within this margin are refreshed
pub const REFRESH_MARGIN: Duration = Duration::from_secs(90);

const EVENT_CAPACITY: usize = 32;

/// Client for Supabase Authentication
///
/// Cloning is cheap; clones share the session, the store and the event
/// channel.
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: Arc<Mutex<Option<Session>>>,

    /// Where the session is persisted
    store: Arc<dyn SessionStore>,

    /// Set once the persisted session has been read back
    restored: Arc<OnceCell<()>>,

    /// Auth state change notifications
    events: broadcast::Sender<AuthChangeEvent>,

    /// Background token refresh
    refresh_task: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Held while a refresh token is being exchanged
    refreshing: Arc<AsyncMutex<()>>,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        let store: Arc<dyn SessionStore> = match &options.session_file {
            Some(path) if options.persist_session => Arc::new(FileStore::new(path)),
            _ => Arc::new(MemoryStore::new()),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(Mutex::new(None)),
            store,
            restored: Arc::new(OnceCell::new()),
            events,
            refresh_task: Arc::new(Mutex::new(None)),
            refreshing: Arc::new(AsyncMutex::new(())),
            options,
        }
    }

    /// Replace the session store
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive every auth state change from now on, in emission order
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChangeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        log::debug!("Auth state change: {:?}", event);
        if self.events.send(AuthChangeEvent { event, session }).is_err() {
            log::trace!("No auth state listeners for {:?}", event);
        }
    }

    /// Read the persisted session back into memory. Runs once; later calls
    /// return immediately.
    pub async fn initialize(&self) -> Result<()> {
        self.restored
            .get_or_try_init(|| async {
                if !self.options.persist_session {
                    return Ok(());
                }
                if let Some(stored) = self.store.load().await? {
                    let mut current = self.lock_session();
                    if current.is_none() {
                        log::info!("Restored session for user {}", stored.user.id);
                        *current = Some(stored.with_expiry());
                    }
                }
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    async fn save_session(&self, session: Session, event: AuthEvent) -> Session {
        let session = session.with_expiry();
        *self.lock_session() = Some(session.clone());

        if self.options.persist_session {
            if let Err(err) = self.store.save(&session).await {
                log::warn!("Failed to persist session: {}", err);
            }
        }

        self.emit(event, Some(session.clone()));
        session
    }

    async fn remove_session(&self) {
        *self.lock_session() = None;

        if let Err(err) = self.store.remove().await {
            log::warn!("Failed to remove persisted session: {}", err);
        }

        self.emit(AuthEvent::SignedOut, None);
    }

    /// Install a session obtained elsewhere
    pub async fn set_session(&self, session: Session) -> Session {
        self.save_session(session, AuthEvent::SignedIn).await
    }

    /// Sign up a new user with email and password.
    ///
    /// `data` ends up in the user's metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<serde_json::Value>,
    ) -> Result<SignUpOutcome> {
        let url = self.get_auth_url("/signup");

        let mut body = json!({
            "email": email,
            "password": password,
        });
        if let Some(data) = data {
            body["data"] = data;
        }

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<SignUpResponse>()
            .await?;

        let mut outcome = SignUpOutcome::from(response);
        if let Some(session) = outcome.session.take() {
            outcome.session = Some(self.save_session(session, AuthEvent::SignedIn).await);
        }

        Ok(outcome)
    }

    /// Sign in a user with email and password
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.get_auth_url("/token");

        let body = json!({
            "email": email,
            "password": password,
        });

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .query("grant_type", "password")
            .json(&body)?
            .execute::<Session>()
            .await?;

        Ok(self.save_session(session, AuthEvent::SignedIn).await)
    }

    /// Sign out the current user.
    ///
    /// The local session is dropped unless the backend failed for a reason
    /// other than the session already being gone (401, 403, 404).
    pub async fn sign_out(&self) -> Result<()> {
        self.initialize().await?;

        let token = self.lock_session().as_ref().map(|s| s.access_token.clone());

        if let Some(token) = token {
            let url = self.get_auth_url("/logout");
            let result = Fetch::post(&self.client, &url)
                .header("apikey", &self.key)
                .bearer_auth(&token)
                .execute_empty()
                .await;

            if let Err(err) = result {
                match err.status() {
                    Some(401) | Some(403) | Some(404) => {
                        log::debug!("Session already gone on the server: {}", err.message());
                    }
                    _ => return Err(err),
                }
            }
        }

        self.remove_session().await;
        Ok(())
    }

    /// Send a password reset email
    pub async fn reset_password_for_email(&self, email: &str) -> Result<()> {
        let url = self.get_auth_url("/recover");

        Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&json!({ "email": email }))?
            .execute_empty()
            .await
    }

    /// Update the signed in user
    pub async fn update_user(&self, attributes: UserAttributes) -> Result<User> {
        let session = self
            .get_session()
            .await?
            .ok_or_else(|| Error::auth("Auth session missing!"))?;

        let url = self.get_auth_url("/user");

        let user = Fetch::put(&self.client, &url)
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .json(&attributes)?
            .execute::<User>()
            .await?;

        let updated = Session {
            user: user.clone(),
            ..session
        };
        self.save_session(updated, AuthEvent::UserUpdated).await;

        Ok(user)
    }

    /// The cached user of the current session, without a network round trip
    pub fn current_user(&self) -> Option<User> {
        self.lock_session().as_ref().map(|s| s.user.clone())
    }

    /// Get the current session, refreshing it first when it is about to
    /// expire.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        self.initialize().await?;

        let current = self.lock_session().clone();
        match current {
            Some(session) if session.expires_within(REFRESH_MARGIN) => {
                self.refresh_or_drop().await.map(Some)
            }
            other => Ok(other),
        }
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session> {
        let refresh_token = self
            .lock_session()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| Error::auth("Auth session missing!"))?;

        let url = self.get_auth_url("/token");

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .query("grant_type", "refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))?
            .execute::<Session>()
            .await?;

        Ok(self.save_session(session, AuthEvent::TokenRefreshed).await)
    }

    /// Refresh; a rejected refresh token ends the session.
    ///
    /// One exchange at a time: a caller that waited for another refresh
    /// gets that result instead of spending the same refresh token again.
    async fn refresh_or_drop(&self) -> Result<Session> {
        let _guard = self.refreshing.lock().await;

        let current = self.lock_session().clone();
        match current {
            Some(session) if !session.expires_within(REFRESH_MARGIN) => return Ok(session),
            None => return Err(Error::auth("Auth session missing!")),
            Some(_) => {}
        }

        match self.refresh_session().await {
            Ok(session) => Ok(session),
            Err(err) => {
                if matches!(err, Error::Api { .. }) {
                    log::info!("Refresh rejected, signing out: {}", err.message());
                    self.remove_session().await;
                }
                Err(err)
            }
        }
    }

    /// Start refreshing the session in the background. Does nothing when
    /// disabled in the options or already running.
    pub fn start_auto_refresh(&self) {
        if !self.options.auto_refresh_token {
            return;
        }

        let mut task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }

        let auth = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(AUTO_REFRESH_TICK);
            loop {
                ticker.tick().await;
                let due = auth
                    .lock_session()
                    .as_ref()
                    .map_or(false, |s| s.expires_within(REFRESH_MARGIN));
                if due {
                    if let Err(err) = auth.refresh_or_drop().await {
                        log::warn!("Auto refresh failed: {}", err);
                    }
                }
            }
        }));
    }

    /// Stop the background refresh task
    pub fn stop_auto_refresh(&self) {
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body(access_token: &str) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token",
            "user": {
                "id": "test_user_id",
                "email": "test@example.com",
                "role": "authenticated"
            }
        })
    }

    fn auth(uri: &str) -> Auth {
        Auth::new(uri, "test_anon_key", Client::new(), ClientOptions::default())
    }

    #[tokio::test]
    async fn test_sign_in_emits_signed_in() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "test_anon_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("test_access_token")))
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        let mut events = auth.on_auth_state_change();

        let session = auth
            .sign_in_with_password("test@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(session.access_token, "test_access_token");
        assert!(session.expires_at.is_some());

        let event = events.recv().await.unwrap();
        assert_eq!(event.event, AuthEvent::SignedIn);
        assert_eq!(event.user().unwrap().id, "test_user_id");
        assert_eq!(auth.current_user().unwrap().id, "test_user_id");
    }

    #[tokio::test]
    async fn test_sign_up_sends_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_json(json!({
                "email": "test@example.com",
                "password": "password123",
                "data": { "full_name": "Test User" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "test_user_id",
                "email": "test@example.com"
            })))
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        let outcome = auth
            .sign_up(
                "test@example.com",
                "password123",
                Some(json!({ "full_name": "Test User" })),
            )
            .await
            .unwrap();

        assert!(outcome.session.is_none());
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_tolerates_missing_server_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "msg": "invalid JWT"
            })))
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        auth.set_session(serde_json::from_value(session_body("stale")).unwrap())
            .await;
        let mut events = auth.on_auth_state_change();

        auth.sign_out().await.unwrap();

        assert!(auth.current_user().is_none());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_keeps_session_on_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "msg": "database unavailable"
            })))
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        auth.set_session(serde_json::from_value(session_body("live")).unwrap())
            .await;

        let err = auth.sign_out().await.unwrap_err();
        assert_eq!(err.message(), "database unavailable");
        assert!(auth.current_user().is_some());
    }

    #[tokio::test]
    async fn test_expiring_session_is_refreshed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({ "refresh_token": "test_refresh_token" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("fresh")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        let mut stale: Session = serde_json::from_value(session_body("stale")).unwrap();
        stale.expires_at = Some(chrono::Utc::now().timestamp() + 10);
        auth.set_session(stale).await;
        let mut events = auth.on_auth_state_change();

        let session = auth.get_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "fresh");
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(session_body("fresh"))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        let mut stale: Session = serde_json::from_value(session_body("stale")).unwrap();
        stale.expires_at = Some(chrono::Utc::now().timestamp() + 10);
        auth.set_session(stale).await;

        // 期限切れ間近のセッションを同時に取得する
        let (first, second) = tokio::join!(auth.get_session(), auth.get_session());
        assert_eq!(first.unwrap().unwrap().access_token, "fresh");
        assert_eq!(second.unwrap().unwrap().access_token, "fresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Already Used"
            })))
            .mount(&mock_server)
            .await;

        let auth = auth(&mock_server.uri());
        let mut expired: Session = serde_json::from_value(session_body("stale")).unwrap();
        expired.expires_at = Some(1);
        auth.set_session(expired).await;
        let mut events = auth.on_auth_state_change();

        let err = auth.get_session().await.unwrap_err();
        assert_eq!(err.message(), "Invalid Refresh Token: Already Used");
        assert!(auth.current_user().is_none());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_persisted_session_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        let mut stored: Session = serde_json::from_value(session_body("persisted")).unwrap();
        stored.expires_at = Some(chrono::Utc::now().timestamp() + 3600);
        FileStore::new(&file).save(&stored).await.unwrap();

        let options = ClientOptions::default().with_session_file(&file);
        let auth = Auth::new("http://localhost:1", "key", Client::new(), options);

        assert!(auth.current_user().is_none());
        let session = auth.get_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "persisted");
        assert_eq!(auth.current_user().unwrap().id, "test_user_id");
    }
}
