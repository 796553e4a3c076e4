//! Ports for avatar storage and hashing

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(test)]
use mockall::automock;

use super::entry::ContentHash;
use crate::domain::DomainError;

/// Digest function used to address blobs by their content
pub trait ContentHasher: Send + Sync {
    /// Compute the hex digest of the given bytes
    fn digest(&self, bytes: &[u8]) -> ContentHash;

    /// Name of the digest algorithm
    fn algorithm(&self) -> &'static str;
}

/// Persistent blob storage addressed by content hash
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the bytes stored under a hash, `None` if no blob exists
    async fn read(&self, hash: &ContentHash) -> Result<Option<Bytes>, DomainError>;

    /// Check whether a blob exists
    async fn exists(&self, hash: &ContentHash) -> Result<bool, DomainError>;

    /// Persist bytes under a hash.
    ///
    /// The write must be atomic: a crash never leaves partial content under the
    /// final name. Returns `false` when the blob was already present and nothing
    /// was written.
    async fn write(&self, hash: &ContentHash, bytes: &[u8]) -> Result<bool, DomainError>;

    /// Delete a blob, returns true if it existed
    async fn delete(&self, hash: &ContentHash) -> Result<bool, DomainError>;
}
