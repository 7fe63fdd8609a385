//! Configuration for the Growth client

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable holding the Supabase project URL
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the Supabase anonymous (public) key
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Environment variable overriding where the session is persisted
pub const SESSION_FILE_VAR: &str = "GROWTH_SESSION_FILE";

/// Configuration options for the Supabase client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to automatically refresh the token
    pub auto_refresh_token: bool,

    /// Whether the session is written to the session store
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// File the session is persisted to; in-memory when unset
    pub session_file: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            session_file: None,
        }
    }
}

impl ClientOptions {
    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the file the session is persisted to
    pub fn with_session_file(mut self, value: impl Into<PathBuf>) -> Self {
        self.session_file = Some(value.into());
        self
    }
}

/// Startup configuration of the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The base URL for the Supabase project
    pub supabase_url: String,

    /// The anonymous API key for the Supabase project
    pub supabase_anon_key: String,

    /// Client options
    pub options: ClientOptions,
}

impl AppConfig {
    /// Create a configuration with default client options
    pub fn new(supabase_url: &str, supabase_anon_key: &str) -> Self {
        Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.to_string(),
            options: ClientOptions::default(),
        }
    }

    /// Replace the client options
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Read the configuration from the process environment.
    ///
    /// Both `SUPABASE_URL` and `SUPABASE_ANON_KEY` must be set and non-empty;
    /// `GROWTH_SESSION_FILE` optionally points the session store at a file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (url, key) = match (non_empty(SUPABASE_URL_VAR), non_empty(SUPABASE_ANON_KEY_VAR)) {
            (Some(url), Some(key)) => (url, key),
            _ => return Err(Error::config("Missing Supabase environment variables")),
        };

        url::Url::parse(&url)?;

        let mut config = Self::new(&url, &key);
        if let Some(path) = non_empty(SESSION_FILE_VAR) {
            config.options = config.options.with_session_file(path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_both_values() {
        let config = AppConfig::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, "https://project.supabase.co/"),
            (SUPABASE_ANON_KEY_VAR, "anon"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon");
        assert!(config.options.session_file.is_none());
    }

    #[test]
    fn missing_values_are_fatal() {
        let err = AppConfig::from_lookup(lookup(&[(SUPABASE_URL_VAR, "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.message(), "Missing Supabase environment variables");

        let err = AppConfig::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, ""),
            (SUPABASE_ANON_KEY_VAR, "anon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn session_file_is_optional() {
        let config = AppConfig::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, "https://project.supabase.co"),
            (SUPABASE_ANON_KEY_VAR, "anon"),
            (SESSION_FILE_VAR, "/tmp/growth-session.json"),
        ]))
        .unwrap();

        assert_eq!(
            config.options.session_file,
            Some(PathBuf::from("/tmp/growth-session.json"))
        );
    }
}
