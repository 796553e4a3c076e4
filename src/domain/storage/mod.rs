//! Storage domain - Generic keyed storage used by the record store

mod entity;
mod repository;

pub use entity::{StorageEntity, StorageKey};
pub use repository::Storage;
