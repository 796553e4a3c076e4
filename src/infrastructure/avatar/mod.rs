//! Avatar cache infrastructure

mod cache;
mod fs_store;
mod hash_lock;
mod hasher;
mod single_flight;

pub use cache::AvatarCache;
pub use fs_store::FsBlobStore;
pub use hash_lock::HashLocks;
pub use hasher::Sha256Hasher;
pub use single_flight::SingleFlight;
