//! Avatar domain
//!
//! Content-addressed avatar entries and the ports the avatar cache is built on:
//! a blob store keyed by content hash and a pluggable digest function.

mod entry;
mod ports;

pub use entry::{AvatarLookup, CacheEntry, ContentHash};
pub use ports::{BlobStore, ContentHasher};

#[cfg(test)]
pub use ports::MockBlobStore;
