//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{validate_user_id, UserValidationError};
use crate::domain::avatar::ContentHash;
use crate::domain::storage::{StorageEntity, StorageKey};

/// User identifier - alphanumeric + hyphens, max 64 characters
///
/// Covers both numeric upstream ids ("42") and generated UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        validate_user_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for UserId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Locally stored user record
///
/// Records created through the directory carry profile fields. Records created
/// by the avatar cache for upstream-only users carry nothing but the avatar hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    avatar_hash: Option<ContentHash>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a record from a validated creation profile
    pub fn new(id: UserId, profile: NewUserProfile) -> Self {
        let now = Utc::now();

        Self {
            id,
            first_name: Some(profile.first_name),
            last_name: profile.last_name,
            email: Some(profile.email),
            avatar_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a record that exists only to hold avatar metadata
    pub fn avatar_only(id: UserId) -> Self {
        let now = Utc::now();

        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
            avatar_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn avatar_hash(&self) -> Option<&ContentHash> {
        self.avatar_hash.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when the record carries no profile data, only avatar metadata
    pub fn is_avatar_only(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }

    // Mutators

    /// Associate the record with a cache entry
    pub fn set_avatar_hash(&mut self, hash: ContentHash) {
        self.avatar_hash = Some(hash);
        self.touch();
    }

    /// Remove the cache entry association, returning the previous hash
    pub fn clear_avatar_hash(&mut self) -> Option<ContentHash> {
        let previous = self.avatar_hash.take();
        self.touch();
        previous
    }

    /// Apply a partial profile update
    pub fn apply_patch(&mut self, patch: ProfilePatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = Some(first_name);
        }

        if let Some(last_name) = patch.last_name {
            self.last_name = Some(last_name);
        }

        if let Some(email) = patch.email {
            self.email = Some(email);
        }

        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Restore a record from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UserId,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
        avatar_hash: Option<ContentHash>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            email,
            avatar_hash,
            created_at,
            updated_at,
        }
    }
}

impl StorageEntity for UserRecord {
    type Key = UserId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct NewUserProfile {
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(email, length(max = 254))]
    pub email: String,
}

/// Partial update of profile fields
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct ProfilePatch {
    #[serde(default, alias = "name")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Profile as reported by the upstream directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Source URL of the profile image
    pub avatar: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first_name: &str, email: &str) -> NewUserProfile {
        NewUserProfile {
            first_name: first_name.to_string(),
            last_name: None,
            email: email.to_string(),
        }
    }

    #[test]
    fn test_user_id_valid() {
        assert_eq!(UserId::new("42").unwrap().as_str(), "42");
        assert_eq!(UserId::new("user-123").unwrap().as_str(), "user-123");
    }

    #[test]
    fn test_user_id_invalid() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("-user").is_err());
        assert!(UserId::new("user-").is_err());
        assert!(UserId::new("a/b").is_err());
    }

    #[test]
    fn test_generated_user_id_is_valid() {
        let id = UserId::generate();
        assert!(UserId::new(id.as_str()).is_ok());
    }

    #[test]
    fn test_record_creation() {
        let record = UserRecord::new(UserId::new("1").unwrap(), profile("Ada", "ada@example.com"));

        assert_eq!(record.first_name(), Some("Ada"));
        assert_eq!(record.email(), Some("ada@example.com"));
        assert!(record.avatar_hash().is_none());
        assert!(!record.is_avatar_only());
    }

    #[test]
    fn test_avatar_only_record() {
        let mut record = UserRecord::avatar_only(UserId::new("7").unwrap());
        assert!(record.is_avatar_only());

        let hash = ContentHash::new("abcd").unwrap();
        record.set_avatar_hash(hash.clone());
        assert_eq!(record.avatar_hash(), Some(&hash));

        assert_eq!(record.clear_avatar_hash(), Some(hash));
        assert!(record.avatar_hash().is_none());
    }

    #[test]
    fn test_apply_patch() {
        let mut record = UserRecord::new(UserId::new("1").unwrap(), profile("Ada", "ada@example.com"));
        let before = record.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(5));

        record.apply_patch(ProfilePatch {
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        });

        assert_eq!(record.first_name(), Some("Ada"));
        assert_eq!(record.last_name(), Some("Lovelace"));
        assert!(record.updated_at() > before);
    }

    #[test]
    fn test_new_profile_accepts_name_alias() {
        let parsed: NewUserProfile =
            serde_json::from_str(r#"{"name": "Ada", "email": "ada@example.com"}"#).unwrap();

        assert_eq!(parsed.first_name, "Ada");
        assert!(parsed.last_name.is_none());
    }

    #[test]
    fn test_record_serialization_skips_empty_profile() {
        let record = UserRecord::avatar_only(UserId::new("7").unwrap());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "7");
        assert!(json.get("email").is_none());
        assert!(json["avatar_hash"].is_null());
    }
}
