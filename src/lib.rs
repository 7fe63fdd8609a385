//! Growth application core
//!
//! Account creation, sign in and out, password reset and a single editable
//! profile, all delegated to a hosted Supabase project. The crate holds the
//! Supabase client pieces the application needs ([`auth`], [`postgrest`]),
//! the [`SessionProvider`] that tracks who is signed in, and one view
//! controller per screen in [`controllers`].

pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod controllers;
pub mod error;
pub mod fetch;
pub mod postgrest;
pub mod profile;
pub mod provider;
pub mod router;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::postgrest::PostgrestClient;

pub use crate::app::App;
pub use crate::backend::{Backend, SupabaseBackend};
pub use crate::provider::{SessionProvider, SessionSnapshot};
pub use crate::router::Route;

/// The Supabase client used by the application
#[derive(Clone)]
pub struct Supabase {
    /// The base URL for the Supabase project
    pub url: String,
    /// The anonymous API key for the Supabase project
    pub key: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for user management and authentication
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
}

impl Supabase {
    /// Create a new Supabase client
    ///
    /// # Example
    ///
    /// ```
    /// use growth_app::Supabase;
    ///
    /// let supabase = Supabase::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Result<Self> {
        Self::new_with_options(supabase_url, supabase_key, ClientOptions::default())
    }

    /// Create a new Supabase client with custom options
    pub fn new_with_options(
        supabase_url: &str,
        supabase_key: &str,
        options: ClientOptions,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let url = supabase_url.trim_end_matches('/').to_string();

        let auth = Auth::new(&url, supabase_key, http_client.clone(), options.clone());

        Ok(Self {
            url,
            key: supabase_key.to_string(),
            http_client,
            auth,
            options,
        })
    }

    /// Get a reference to the auth client for user management and authentication
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Create a new PostgrestClient for a table, acting as the anonymous role
    pub fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient::new(
            &self.url,
            &self.key,
            table,
            &self.options.db_schema,
            self.http_client.clone(),
        )
    }

    /// Create a new PostgrestClient for a table, acting as the signed in
    /// user. Falls back to the anonymous role without a session; a failed
    /// session refresh is returned as is.
    pub async fn from_as_user(&self, table: &str) -> Result<PostgrestClient> {
        let client = self.from(table);
        match self.auth.get_session().await? {
            Some(session) => Ok(client.with_auth(&session.access_token)),
            None => Ok(client),
        }
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{AppConfig, ClientOptions};
    pub use crate::error::{Error, Result};
    pub use crate::App;
    pub use crate::Supabase;
}
