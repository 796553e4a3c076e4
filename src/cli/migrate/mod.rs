//! Migrate command - PostgreSQL schema management

use clap::{Args, ValueEnum};
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::{init_logging, LoggingConfig};
use crate::infrastructure::storage::{
    revert_last_storage_migration, run_storage_migrations, storage_migrations, PostgresMigrator,
};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// What to do with the schema
    #[arg(value_enum, default_value_t = MigrateAction::Run)]
    pub action: MigrateAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MigrateAction {
    /// Apply all pending migrations
    Run,
    /// Revert the most recent migration
    Revert,
    /// Show applied and pending migrations
    Status,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&LoggingConfig::from(&config.logging));

    let pool = crate::connect_postgres(&config.storage).await?;

    match args.action {
        MigrateAction::Run => {
            run_storage_migrations(&pool).await?;
            info!("Migrations applied");
        }
        MigrateAction::Revert => match revert_last_storage_migration(&pool).await? {
            Some(version) => info!(version, "Migration reverted"),
            None => info!("No migrations to revert"),
        },
        MigrateAction::Status => {
            let applied = PostgresMigrator::new(pool.clone()).applied_versions().await?;

            for migration in storage_migrations() {
                let state = if applied.contains(&migration.version) {
                    "applied"
                } else {
                    "pending"
                };
                info!(
                    version = migration.version,
                    description = %migration.description,
                    state,
                    "Migration"
                );
            }
        }
    }

    pool.close().await;

    Ok(())
}
