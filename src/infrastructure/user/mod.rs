//! User record repositories
//!
//! `StorageUserRepository` works over any `Storage<UserRecord>` backend;
//! `PostgresUserRepository` uses a dedicated table with an indexed avatar hash.

mod postgres_repository;
mod repository;

pub use postgres_repository::PostgresUserRepository;
pub use repository::StorageUserRepository;
