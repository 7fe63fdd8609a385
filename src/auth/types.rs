//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::session::Session;

/// User data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default)]
    pub phone: Option<String>,

    /// The app metadata
    #[serde(default)]
    pub app_metadata: HashMap<String, serde_json::Value>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,

    /// Whether the email has been confirmed
    #[serde(default)]
    pub email_confirmed_at: Option<String>,

    /// The last sign-in time
    #[serde(default)]
    pub last_sign_in_at: Option<String>,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,

    /// The update time
    #[serde(default)]
    pub updated_at: Option<String>,

    /// The user's role
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    /// The `full_name` stored in the user metadata at sign up
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Body returned by `/signup`.
///
/// GoTrue answers with a full session when email confirmation is disabled
/// and with the bare user otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    /// The user is signed in right away
    Session(Session),
    /// The user has to confirm the email first
    User(User),
}

/// Result of a sign up
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    /// The created user
    pub user: Option<User>,
    /// The session, when the backend signed the user in immediately
    pub session: Option<Session>,
}

impl From<SignUpResponse> for SignUpOutcome {
    fn from(response: SignUpResponse) -> Self {
        match response {
            SignUpResponse::Session(session) => Self {
                user: Some(session.user.clone()),
                session: Some(session),
            },
            SignUpResponse::User(user) => Self {
                user: Some(user),
                session: None,
            },
        }
    }
}

/// User attributes that can be updated
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// User metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Kind of change announced on the auth channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification sent to every auth channel subscriber
#[derive(Debug, Clone)]
pub struct AuthChangeEvent {
    /// What happened
    pub event: AuthEvent,
    /// The session after the change
    pub session: Option<Session>,
}

impl AuthChangeEvent {
    /// The identity carried by the event
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_up_with_session() {
        let body = json!({
            "access_token": "token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": {
                "id": "user-1",
                "email": "user@example.com",
                "user_metadata": { "full_name": "Ada" }
            }
        });

        let outcome: SignUpOutcome = serde_json::from_value::<SignUpResponse>(body)
            .unwrap()
            .into();
        assert!(outcome.session.is_some());
        assert_eq!(outcome.user.unwrap().full_name(), Some("Ada"));
    }

    #[test]
    fn sign_up_awaiting_confirmation() {
        let body = json!({
            "id": "user-1",
            "email": "user@example.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        });

        let outcome: SignUpOutcome = serde_json::from_value::<SignUpResponse>(body)
            .unwrap()
            .into();
        assert!(outcome.session.is_none());
        assert_eq!(outcome.user.unwrap().id, "user-1");
    }

    #[test]
    fn attributes_skip_unset_fields() {
        let attrs = UserAttributes {
            password: Some("new-password".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&attrs).unwrap(),
            json!({ "password": "new-password" })
        );
    }
}
