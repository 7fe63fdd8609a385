//! Scripted backend shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use growth_app::auth::{AuthChangeEvent, AuthEvent, Session, SignUpOutcome, User};
use growth_app::error::{Error, Result};
use growth_app::profile::{Profile, ProfileUpdate, UserRecord};
use growth_app::Backend;

pub const USER_ID: &str = "0b7e2f4c-user";

pub fn user(email: &str) -> User {
    serde_json::from_value(json!({
        "id": USER_ID,
        "email": email,
        "user_metadata": { "full_name": "Test User" }
    }))
    .unwrap()
}

pub fn session_for(email: &str) -> Session {
    Session {
        access_token: "access-token".to_string(),
        refresh_token: "refresh-token".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: None,
        user: user(email),
    }
}

/// Session of a second account, without sign up metadata
pub fn session_as(id: &str, email: &str) -> Session {
    let mut session = session_for(email);
    session.user = serde_json::from_value(json!({ "id": id, "email": email })).unwrap();
    session
}

/// Let spawned tasks run until `done` holds
pub async fn eventually<F: Fn() -> bool>(done: F) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[derive(Default)]
struct Script {
    session: Option<Session>,
    failures: HashMap<&'static str, Error>,
    profile: Option<Profile>,
    record: Option<UserRecord>,
    updates: Vec<ProfileUpdate>,
    calls: Vec<&'static str>,
    delay: Option<Duration>,
    confirm_email: bool,
}

/// In-process [`Backend`]: every call is logged, failures are scripted per
/// operation and used once.
pub struct FakeBackend {
    script: Mutex<Script>,
    events: broadcast::Sender<AuthChangeEvent>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            script: Mutex::new(Script::default()),
            events,
        })
    }

    pub fn signed_in(email: &str) -> Arc<Self> {
        let backend = Self::new();
        backend.script.lock().unwrap().session = Some(session_for(email));
        backend
    }

    /// Make the next call of `op` fail with `err`
    pub fn fail(&self, op: &'static str, err: Error) {
        self.script.lock().unwrap().failures.insert(op, err);
    }

    /// Hold every call for `delay` before answering
    pub fn delay(&self, delay: Duration) {
        self.script.lock().unwrap().delay = Some(delay);
    }

    /// Sign ups return no session, as with email confirmation turned on
    pub fn require_email_confirmation(&self) {
        self.script.lock().unwrap().confirm_email = true;
    }

    pub fn set_profile(&self, profile: Profile) {
        self.script.lock().unwrap().profile = Some(profile);
    }

    pub fn set_record(&self, record: UserRecord) {
        self.script.lock().unwrap().record = Some(record);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == op)
            .count()
    }

    pub fn updates(&self) -> Vec<ProfileUpdate> {
        self.script.lock().unwrap().updates.clone()
    }

    /// Emit an event as if it came from the backend
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        self.script.lock().unwrap().session = session.clone();
        let _ = self.events.send(AuthChangeEvent { event, session });
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(op);
            script.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().unwrap().failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome> {
        self.enter("sign_up").await?;
        let mut session = session_for(email);
        session
            .user
            .user_metadata
            .insert("full_name".to_string(), json!(display_name));

        if self.script.lock().unwrap().confirm_email {
            return Ok(SignUpOutcome {
                user: Some(session.user),
                session: None,
            });
        }
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(SignUpOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
        self.enter("sign_in").await?;
        let session = session_for(email);
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.enter("sign_out").await?;
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_request(&self, _email: &str) -> Result<()> {
        self.enter("reset_password_request").await
    }

    async fn update_password(&self, _new_password: &str) -> Result<User> {
        self.enter("update_password").await?;
        let session = self.script.lock().unwrap().session.clone();
        match session {
            Some(session) => {
                self.emit(AuthEvent::UserUpdated, Some(session.clone()));
                Ok(session.user)
            }
            None => Err(Error::auth("Auth session missing!")),
        }
    }

    fn current_identity(&self) -> Option<User> {
        self.script
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|s| s.user.clone())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        self.enter("current_session").await?;
        Ok(self.script.lock().unwrap().session.clone())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.enter("get_profile").await?;
        self.script
            .lock()
            .unwrap()
            .profile
            .clone()
            .filter(|p| p.id == user_id)
            .ok_or_else(|| Error::api(406, "JSON object requested, multiple (or no) rows returned"))
    }

    async fn update_profile(&self, _user_id: &str, update: &ProfileUpdate) -> Result<()> {
        self.enter("update_profile").await?;
        self.script.lock().unwrap().updates.push(update.clone());
        Ok(())
    }

    async fn get_user_data(&self, user_id: &str) -> Result<UserRecord> {
        self.enter("get_user_data").await?;
        self.script
            .lock()
            .unwrap()
            .record
            .clone()
            .filter(|r| r.id == user_id)
            .ok_or_else(|| Error::api(404, "relation \"public.users\" does not exist"))
    }

    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChangeEvent> {
        self.events.subscribe()
    }
}
