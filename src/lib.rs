//! Avatar Directory
//!
//! User-directory front end that caches profile images in a content-addressed
//! store and announces newly created users over a message broker and email.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use api::state::AppState;
use config::{StorageBackend, StorageConfig};
use domain::{EventPublisher, MailTransport, UserRecord, UserRepository};
use infrastructure::avatar::{AvatarCache, FsBlobStore, Sha256Hasher};
use infrastructure::directory::HttpDirectoryClient;
use infrastructure::event::{AmqpEventPublisher, InMemoryEventPublisher};
use infrastructure::notification::{
    HttpMailTransport, LogMailTransport, MailTransportKind, NotificationSender,
};
use infrastructure::services::UserCreationService;
use infrastructure::storage::{run_storage_migrations, InMemoryStorage};
use infrastructure::user::{PostgresUserRepository, StorageUserRepository};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state from configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let users = create_user_repository(&config.storage).await?;
    let directory = Arc::new(HttpDirectoryClient::new(&config.directory)?);

    let blobs = FsBlobStore::new(&config.avatar.storage_dir);
    let removed = blobs.remove_stale_temp_files().await?;

    if removed > 0 {
        info!(removed, "Removed stale temporary avatar files");
    }

    let publisher = create_event_publisher(config).await;
    let notifier = NotificationSender::new(
        create_mail_transport(config)?,
        config.mail.retry_policy(),
    );

    let user_service = UserCreationService::new(
        users.clone(),
        directory.clone(),
        publisher.clone(),
        notifier,
    )
    .with_background_side_effects(config.creation.background_side_effects);

    let avatar_cache = AvatarCache::new(
        users.clone(),
        directory,
        Arc::new(blobs),
        Arc::new(Sha256Hasher),
        config.avatar.memory_cache_capacity,
    );

    info!(
        storage_dir = %config.avatar.storage_dir,
        directory = %config.directory.base_url,
        "Application state ready"
    );

    Ok(AppState::new(user_service, avatar_cache, users, publisher))
}

/// Open a PostgreSQL pool for the configured database
pub async fn connect_postgres(storage: &StorageConfig) -> anyhow::Result<PgPool> {
    let url = storage
        .database_url
        .as_deref()
        .context("storage.database_url is required for the postgres backend")?;

    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(storage.max_connections)
        .connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("PostgreSQL connection established");

    Ok(pool)
}

async fn create_user_repository(
    storage: &StorageConfig,
) -> anyhow::Result<Arc<dyn UserRepository>> {
    info!(backend = ?storage.backend, "Storage backend");

    match storage.backend {
        StorageBackend::InMemory => Ok(Arc::new(StorageUserRepository::new(Arc::new(
            InMemoryStorage::<UserRecord>::new(),
        )))),
        StorageBackend::Postgres => {
            let pool = connect_postgres(storage).await?;
            run_storage_migrations(&pool).await?;

            Ok(Arc::new(PostgresUserRepository::new(pool)))
        }
    }
}

async fn create_event_publisher(config: &AppConfig) -> Arc<dyn EventPublisher> {
    if !config.broker.enabled {
        info!("Broker disabled, events are kept in memory");
        return Arc::new(InMemoryEventPublisher::new());
    }

    match AmqpEventPublisher::connect(&config.broker).await {
        Ok(publisher) => {
            info!(queue = %config.broker.queue, "Connected to message broker");
            Arc::new(publisher)
        }
        Err(e) => {
            warn!(error = %e, "Broker unreachable at startup, will connect on first publish");
            Arc::new(AmqpEventPublisher::new(&config.broker))
        }
    }
}

fn create_mail_transport(config: &AppConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    let transport: Arc<dyn MailTransport> = match config.mail.transport {
        MailTransportKind::Log => Arc::new(LogMailTransport::new(&config.mail.from)),
        MailTransportKind::Http => Arc::new(HttpMailTransport::new(&config.mail)?),
    };

    info!(transport = transport.name(), "Mail transport configured");

    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_app_state_in_memory() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.avatar.storage_dir = dir.path().to_string_lossy().into_owned();

        let state = create_app_state_with_config(&config).await.unwrap();

        assert!(state.publisher.is_connected().await);
    }

    #[tokio::test]
    async fn test_postgres_backend_requires_url() {
        let storage = StorageConfig {
            backend: StorageBackend::Postgres,
            database_url: None,
            max_connections: 1,
        };

        assert!(connect_postgres(&storage).await.is_err());
    }

    #[test]
    fn test_http_mail_transport_requires_endpoint() {
        let mut config = AppConfig::default();
        config.mail.transport = MailTransportKind::Http;

        assert!(create_mail_transport(&config).is_err());
    }
}
