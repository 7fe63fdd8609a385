//! Error handling for the Growth client

use std::fmt;
use thiserror::Error;

/// Unified error type for the Growth client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A non-success response from GoTrue or PostgREST
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Authentication errors raised locally (missing session and the like)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Database query errors
    #[error("Database error: {0}")]
    Database(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Session store I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Whether the error was reported by the backend (or the trip to it)
    /// rather than raised by local code.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Api { .. } | Error::Auth(_) | Error::Database(_) | Error::Http(_)
        )
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The bare message of the error, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::Auth(msg)
            | Error::Database(msg)
            | Error::Config(msg)
            | Error::General(msg) => msg.clone(),
            Error::Http(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    /// Text to show to the user: remote errors verbatim, anything else as
    /// the given fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        if self.is_remote() {
            self.message()
        } else {
            fallback.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_are_shown_verbatim() {
        let err = Error::api(400, "Invalid login credentials");
        assert!(err.is_remote());
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.user_message("An unexpected error occurred"),
            "Invalid login credentials"
        );

        let err = Error::database("network down");
        assert_eq!(err.user_message("Failed to update profile"), "network down");
    }

    #[test]
    fn local_errors_use_the_fallback() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(!err.is_remote());
        assert_eq!(
            err.user_message("An unexpected error occurred"),
            "An unexpected error occurred"
        );
        assert_eq!(Error::general("boom").user_message("fallback"), "fallback");
    }

    #[test]
    fn transport_errors_drop_the_category_prefix() {
        let reqwest_err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let expected = reqwest_err.to_string();
        let err = Error::from(reqwest_err);

        assert!(err.is_remote());
        assert!(!err.message().starts_with("HTTP error"));
        assert_eq!(err.user_message("fallback"), expected);
    }
}
