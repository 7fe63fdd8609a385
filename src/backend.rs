//! The remote calls the screens make, behind one trait

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use crate::auth::{AuthChangeEvent, Session, SignUpOutcome, User, UserAttributes};
use crate::error::Result;
use crate::profile::{Profile, ProfileUpdate, UserRecord, PROFILES_TABLE, USERS_TABLE};
use crate::Supabase;

/// Remote procedures of the hosted backend.
///
/// Every call is a single request; failures come back as [`crate::error::Error`]
/// and are never retried.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create an account; `display_name` is stored as `full_name` metadata
    async fn sign_up(&self, email: &str, password: &str, display_name: &str)
        -> Result<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// Ask for a reset email. Delivery is not confirmed beyond acceptance.
    async fn reset_password_request(&self, email: &str) -> Result<()>;

    async fn update_password(&self, new_password: &str) -> Result<User>;

    /// Cached identity of the current session, no network round trip
    fn current_identity(&self) -> Option<User>;

    async fn current_session(&self) -> Result<Option<Session>>;

    async fn get_profile(&self, user_id: &str) -> Result<Profile>;

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()>;

    async fn get_user_data(&self, user_id: &str) -> Result<UserRecord>;

    /// Auth state changes, in the order the backend emits them
    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChangeEvent>;
}

/// [`Backend`] talking to a Supabase project
#[derive(Clone)]
pub struct SupabaseBackend {
    supabase: Supabase,
}

impl SupabaseBackend {
    pub fn new(supabase: Supabase) -> Self {
        Self { supabase }
    }

    pub fn supabase(&self) -> &Supabase {
        &self.supabase
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome> {
        self.supabase
            .auth()
            .sign_up(email, password, Some(json!({ "full_name": display_name })))
            .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.supabase
            .auth()
            .sign_in_with_password(email, password)
            .await
    }

    async fn sign_out(&self) -> Result<()> {
        self.supabase.auth().sign_out().await
    }

    async fn reset_password_request(&self, email: &str) -> Result<()> {
        self.supabase.auth().reset_password_for_email(email).await
    }

    async fn update_password(&self, new_password: &str) -> Result<User> {
        self.supabase
            .auth()
            .update_user(UserAttributes {
                password: Some(new_password.to_string()),
                ..Default::default()
            })
            .await
    }

    fn current_identity(&self) -> Option<User> {
        self.supabase.auth().current_user()
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        self.supabase.auth().get_session().await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.supabase
            .from_as_user(PROFILES_TABLE)
            .await?
            .select("*")
            .eq("id", user_id)
            .single()
            .await
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.supabase
            .from_as_user(PROFILES_TABLE)
            .await?
            .update(update)
            .eq("id", user_id)
            .execute()
            .await
    }

    async fn get_user_data(&self, user_id: &str) -> Result<UserRecord> {
        self.supabase
            .from_as_user(USERS_TABLE)
            .await?
            .select("*")
            .eq("id", user_id)
            .single()
            .await
    }

    fn subscribe_auth_changes(&self) -> broadcast::Receiver<AuthChangeEvent> {
        self.supabase.auth().on_auth_state_change()
    }
}
