//! Session management for authentication

use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::User;

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The expiry timestamp (unix seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The signed in user
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

impl Session {
    /// Fill in `expires_at` when the backend left it out.
    ///
    /// The `exp` claim of the access token wins over `expires_in`.
    pub fn with_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(
                token_expiry(&self.access_token)
                    .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in),
            );
        }
        self
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// Check if the session expires within the given margin
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() + margin.as_secs() as i64 >= expires_at,
            None => false,
        }
    }
}

/// Read the `exp` claim without verifying the signature; the client never
/// holds the signing secret.
fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match jsonwebtoken::decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
    {
        Ok(data) => data.claims.exp,
        Err(err) => {
            log::debug!("Access token carries no readable exp claim: {}", err);
            None
        }
    }
}
