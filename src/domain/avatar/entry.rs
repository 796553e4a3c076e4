//! Cache entry types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

const MAX_HASH_LENGTH: usize = 128;

/// Lowercase hex digest identifying a cache entry
///
/// Only hex digits are accepted, so a hash is always safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hex: impl Into<String>) -> Result<Self, DomainError> {
        let hex = hex.into();

        if hex.is_empty() {
            return Err(DomainError::validation("Content hash cannot be empty"));
        }

        if hex.len() > MAX_HASH_LENGTH {
            return Err(DomainError::validation(format!(
                "Content hash exceeds maximum length of {} characters",
                MAX_HASH_LENGTH
            )));
        }

        if let Some(c) = hex
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(DomainError::validation(format!(
                "Content hash contains invalid character: '{}'",
                c
            )));
        }

        Ok(Self(hex))
    }

    /// Encode a raw digest as a hash; hex encoding is always valid
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable content-addressed blob: the same hash always denotes the same bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    hash: ContentHash,
    bytes: Bytes,
}

impl CacheEntry {
    pub fn new(hash: ContentHash, bytes: Bytes) -> Self {
        Self { hash, bytes }
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Result of reading the avatar cache without touching the upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarLookup {
    Hit(CacheEntry),
    Miss,
}

impl AvatarLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_valid() {
        let hash = ContentHash::new("deadbeef0123").unwrap();
        assert_eq!(hash.as_str(), "deadbeef0123");
    }

    #[test]
    fn test_content_hash_rejects_path_characters() {
        assert!(ContentHash::new("../etc/passwd").is_err());
        assert!(ContentHash::new("abc/def").is_err());
    }

    #[test]
    fn test_content_hash_rejects_uppercase_and_empty() {
        assert!(ContentHash::new("DEADBEEF").is_err());
        assert!(ContentHash::new("").is_err());
    }

    #[test]
    fn test_content_hash_serde_validates() {
        let json = serde_json::to_string(&ContentHash::new("abc123").unwrap()).unwrap();
        assert_eq!(json, "\"abc123\"");

        let parsed: Result<ContentHash, _> = serde_json::from_str("\"not-hex\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_lookup_is_hit() {
        let entry = CacheEntry::new(ContentHash::new("ab").unwrap(), Bytes::from_static(b"x"));
        assert!(AvatarLookup::Hit(entry).is_hit());
        assert!(!AvatarLookup::Miss.is_hit());
    }
}
