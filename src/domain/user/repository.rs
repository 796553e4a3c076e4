//! User repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{ProfilePatch, UserId, UserRecord};
use crate::domain::avatar::ContentHash;
use crate::domain::DomainError;

/// Repository trait for user record storage
///
/// Profile fields and the avatar association are written through separate
/// operations, each atomic for one record, so neither path can overwrite the
/// other's concurrent change.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a record by its ID
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DomainError>;

    /// Create a new record, fails with `Conflict` if the ID is taken
    async fn create(&self, user: UserRecord) -> Result<UserRecord, DomainError>;

    /// Delete a record, returns true if it existed
    async fn delete(&self, id: &UserId) -> Result<bool, DomainError>;

    /// Apply a patch to the profile fields only; `None` if the record is absent
    async fn update_profile(
        &self,
        id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<UserRecord>, DomainError>;

    /// Point the record at `hash`, creating an avatar-only record if needed
    ///
    /// Returns the hash the record referenced before.
    async fn associate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<Option<ContentHash>, DomainError>;

    /// Clear the association if it still points at `hash`
    ///
    /// Avatar-only records are deleted instead. Returns false when the record
    /// is gone or references another hash.
    async fn dissociate_avatar(
        &self,
        id: &UserId,
        hash: &ContentHash,
    ) -> Result<bool, DomainError>;

    /// Number of records whose avatar hash equals `hash`
    async fn count_by_avatar_hash(&self, hash: &ContentHash) -> Result<usize, DomainError>;

    /// Check if a user ID exists
    async fn exists(&self, id: &UserId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }
}
