//! Database operations through the PostgREST API

mod query;

use reqwest::Client;
use serde::Serialize;

pub use query::*;

/// Client for database operations on one table
pub struct PostgrestClient {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// The table or view name
    table: String,

    /// The database schema
    schema: String,

    /// Bearer token sent with every request; the anon key when unset
    token: Option<String>,

    /// HTTP client
    client: Client,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub(crate) fn new(url: &str, key: &str, table: &str, schema: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            table: table.to_string(),
            schema: schema.to_string(),
            token: None,
            client,
        }
    }

    /// Run the requests as the user owning this access token
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Get the base URL for REST API requests
    fn get_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn target(&self) -> Target {
        Target {
            url: self.get_url(),
            key: self.key.clone(),
            token: self.token.clone().unwrap_or_else(|| self.key.clone()),
            schema: self.schema.clone(),
            client: self.client.clone(),
        }
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target(), columns)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target(), values)
    }
}
