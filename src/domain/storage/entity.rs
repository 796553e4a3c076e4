//! Storage entity traits

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for backends that index by string
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    type Key: StorageKey;

    fn key(&self) -> &Self::Key;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{UserId, UserRecord};

    #[test]
    fn test_user_id_is_storage_key() {
        let key = UserId::new("user-42").unwrap();
        assert_eq!(StorageKey::as_str(&key), "user-42");
    }

    #[test]
    fn test_user_record_is_keyed_by_id() {
        let record = UserRecord::avatar_only(UserId::new("7").unwrap());
        assert_eq!(record.key().as_str(), "7");
    }
}
