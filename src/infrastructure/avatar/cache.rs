//! Content-addressed avatar cache

use std::sync::Arc;

use bytes::Bytes;
use moka::future::Cache;
use tracing::{debug, error, info};

use super::hash_lock::HashLocks;
use super::single_flight::SingleFlight;
use crate::domain::avatar::{AvatarLookup, BlobStore, CacheEntry, ContentHash, ContentHasher};
use crate::domain::directory::DirectoryClient;
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_avatar_blob_deleted, record_avatar_blob_written, record_avatar_cache_hit,
    record_avatar_cache_miss,
};

/// Maps users to hash-addressed avatar blobs
///
/// Blobs are immutable and shared: users whose upstream images are
/// byte-identical reference one blob. A blob is deleted only once no record
/// references its hash. Concurrent resolves for the same user share a single
/// upstream fetch and write.
#[derive(Clone)]
pub struct AvatarCache {
    inner: Arc<Inner>,
    in_flight: SingleFlight<UserId, Bytes>,
}

struct Inner {
    users: Arc<dyn UserRepository>,
    directory: Arc<dyn DirectoryClient>,
    blobs: Arc<dyn BlobStore>,
    hasher: Arc<dyn ContentHasher>,
    hot: Cache<ContentHash, Bytes>,
    hash_locks: HashLocks,
}

impl std::fmt::Debug for AvatarCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarCache")
            .field("algorithm", &self.inner.hasher.algorithm())
            .field("hot_entries", &self.inner.hot.entry_count())
            .finish_non_exhaustive()
    }
}

impl AvatarCache {
    pub fn new(
        users: Arc<dyn UserRepository>,
        directory: Arc<dyn DirectoryClient>,
        blobs: Arc<dyn BlobStore>,
        hasher: Arc<dyn ContentHasher>,
        hot_capacity: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                users,
                directory,
                blobs,
                hasher,
                hot: Cache::new(hot_capacity),
                hash_locks: HashLocks::new(),
            }),
            in_flight: SingleFlight::new(),
        }
    }

    /// Read a user's avatar from local storage without going upstream
    ///
    /// Returns `Miss` when the user has no record or no avatar hash. A hash
    /// whose blob is gone is reported as `CacheCorrupted`.
    pub async fn get_cached_avatar(&self, id: &UserId) -> Result<AvatarLookup, DomainError> {
        let lookup = self.inner.get_cached(id).await?;

        if lookup.is_hit() {
            record_avatar_cache_hit();
            debug!(user_id = %id, "Avatar cache hit");
        } else {
            record_avatar_cache_miss();
            debug!(user_id = %id, "Avatar cache miss");
        }

        Ok(lookup)
    }

    /// Fetch a user's avatar from the upstream directory and cache it
    pub async fn resolve_and_cache(&self, id: &UserId) -> Result<Bytes, DomainError> {
        let inner = Arc::clone(&self.inner);
        let key = id.clone();

        self.in_flight
            .run(id.clone(), move || async move { inner.resolve(&key).await })
            .await
    }

    /// Cached bytes if present, otherwise resolve from upstream
    pub async fn get_or_fetch(&self, id: &UserId) -> Result<Bytes, DomainError> {
        match self.get_cached_avatar(id).await? {
            AvatarLookup::Hit(entry) => Ok(entry.into_bytes()),
            AvatarLookup::Miss => self.resolve_and_cache(id).await,
        }
    }

    /// Remove a user's avatar association, returning the removed hash
    ///
    /// Avatar-only records are deleted; records with profile data keep
    /// everything but the hash. The blob itself goes once unreferenced.
    pub async fn evict(&self, id: &UserId) -> Result<Option<ContentHash>, DomainError> {
        self.inner.evict(id).await
    }
}

impl Inner {
    async fn get_cached(&self, id: &UserId) -> Result<AvatarLookup, DomainError> {
        let Some(hash) = self.current_hash(id).await? else {
            return Ok(AvatarLookup::Miss);
        };

        if let Some(bytes) = self.hot.get(&hash).await {
            return Ok(AvatarLookup::Hit(CacheEntry::new(hash, bytes)));
        }

        if let Some(bytes) = self.blobs.read(&hash).await? {
            self.hot.insert(hash.clone(), bytes.clone()).await;
            return Ok(AvatarLookup::Hit(CacheEntry::new(hash, bytes)));
        }

        // An eviction may have released the hash after we read the record
        if self.current_hash(id).await?.as_ref() != Some(&hash) {
            return Ok(AvatarLookup::Miss);
        }

        error!(user_id = %id, hash = %hash, "Avatar record references a missing blob");

        Err(DomainError::cache_corrupted(format!(
            "Blob '{}' referenced by user '{}' is missing",
            hash, id
        )))
    }

    async fn resolve(&self, id: &UserId) -> Result<Bytes, DomainError> {
        let profile = self.directory.lookup(id).await?;

        if profile.avatar.trim().is_empty() {
            return Err(DomainError::not_found(format!(
                "User '{}' has no avatar upstream",
                id
            )));
        }

        let bytes = self.directory.fetch_bytes(&profile.avatar).await?;
        let hash = self.hasher.digest(&bytes);

        let previous = {
            let _guard = self.hash_locks.lock(&hash).await;

            if self.blobs.write(&hash, &bytes).await? {
                record_avatar_blob_written(bytes.len());
            }

            self.users.associate_avatar(id, &hash).await?
        };

        self.hot.insert(hash.clone(), bytes.clone()).await;

        if let Some(previous) = previous.filter(|p| *p != hash) {
            let _guard = self.hash_locks.lock(&previous).await;
            self.release(&previous).await?;
        }

        info!(user_id = %id, hash = %hash, size = bytes.len(), "Avatar cached");

        Ok(bytes)
    }

    async fn evict(&self, id: &UserId) -> Result<Option<ContentHash>, DomainError> {
        loop {
            let Some(hash) = self.current_hash(id).await? else {
                return Ok(None);
            };

            let _guard = self.hash_locks.lock(&hash).await;

            // The association may have moved while waiting for the lock
            if !self.users.dissociate_avatar(id, &hash).await? {
                continue;
            }

            let deleted = self.release(&hash).await?;

            info!(user_id = %id, hash = %hash, blob_deleted = deleted, "Avatar evicted");

            return Ok(Some(hash));
        }
    }

    /// Delete the blob if no record references it; caller holds the hash lock
    async fn release(&self, hash: &ContentHash) -> Result<bool, DomainError> {
        let references = self.users.count_by_avatar_hash(hash).await?;

        if references > 0 {
            debug!(hash = %hash, references, "Blob still referenced, keeping it");
            return Ok(false);
        }

        self.hot.invalidate(hash).await;
        let deleted = self.blobs.delete(hash).await?;

        if deleted {
            record_avatar_blob_deleted();
        }

        Ok(deleted)
    }

    async fn current_hash(&self, id: &UserId) -> Result<Option<ContentHash>, DomainError> {
        Ok(self
            .users
            .get(id)
            .await?
            .and_then(|record| record.avatar_hash().cloned()))
    }
}
