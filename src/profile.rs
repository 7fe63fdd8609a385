//! Rows of the `profiles` and `users` tables

use serde::{Deserialize, Serialize};

/// Table holding the editable profile of each user
pub const PROFILES_TABLE: &str = "profiles";

/// Table holding account data kept next to the auth user
pub const USERS_TABLE: &str = "users";

/// A `profiles` row, keyed by the auth user id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Partial update of a profile; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ProfileUpdate {
    /// Update all three fields at once, as the profile form does
    pub fn all(bio: &str, location: &str, website: &str) -> Self {
        Self {
            bio: Some(bio.to_string()),
            location: Some(location.to_string()),
            website: Some(website.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.location.is_none() && self.website.is_none()
    }
}

/// A `users` row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_update_only_sends_set_fields() {
        let update = ProfileUpdate {
            bio: Some("hi".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "bio": "hi" }));
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn missing_columns_read_as_none() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "user-1",
            "bio": "x",
            "website": null
        }))
        .unwrap();
        assert_eq!(profile.bio.as_deref(), Some("x"));
        assert!(profile.location.is_none());
        assert!(profile.website.is_none());
    }
}
