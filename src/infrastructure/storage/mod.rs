//! Storage infrastructure - Storage implementations

mod in_memory;
pub mod migrations;

pub use in_memory::InMemoryStorage;
pub use migrations::{
    revert_last_storage_migration, run_storage_migrations, storage_migrations, Migration,
    PostgresMigrator,
};
