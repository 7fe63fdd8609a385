//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};

/// Accept header asking PostgREST for exactly one row as an object
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Everything a builder needs to address one table
pub struct Target {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) token: String,
    pub(crate) schema: String,
    pub(crate) client: Client,
}

impl Target {
    fn prepare<'a>(&self, fetch: FetchBuilder<'a>, profile_header: &str) -> FetchBuilder<'a> {
        let fetch = fetch
            .header("apikey", &self.key)
            .bearer_auth(&self.token);
        if self.schema == "public" {
            fetch
        } else {
            fetch.header(profile_header, &self.schema)
        }
    }
}

/// Filter rows where column equals a value
fn eq_filter<T: ToString>(filters: &mut Vec<(String, String)>, column: &str, value: T) {
    filters.push((column.to_string(), format!("eq.{}", value.to_string())));
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    params: Vec<(String, String)>,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(target: Target, columns: &str) -> Self {
        Self {
            target,
            params: vec![("select".to_string(), columns.to_string())],
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        eq_filter(&mut self.params, column, value);
        self
    }

    /// Execute the query expecting exactly one row.
    ///
    /// Zero or several matching rows come back as a 406 API error.
    pub async fn single<T: DeserializeOwned>(self) -> Result<T, Error> {
        self.target
            .prepare(Fetch::get(&self.target.client, &self.target.url), "Accept-Profile")
            .header("Accept", SINGLE_OBJECT)
            .query_pairs(self.params.clone())
            .execute::<T>()
            .await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    filters: Vec<(String, String)>,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            filters: Vec::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        eq_filter(&mut self.filters, column, value);
        self
    }

    /// Execute the update without returning the updated rows.
    ///
    /// Matching no row is not an error.
    pub async fn execute(self) -> Result<(), Error> {
        self.target
            .prepare(Fetch::patch(&self.target.client, &self.target.url), "Content-Profile")
            .header("Prefer", "return=minimal")
            .query_pairs(self.filters.clone())
            .json(&self.values)?
            .execute_empty()
            .await
    }
}
