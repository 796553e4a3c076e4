use serde::Deserialize;

use crate::infrastructure::directory::DirectoryClientConfig;
use crate::infrastructure::event::BrokerConfig;
use crate::infrastructure::notification::MailConfig;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub directory: DirectoryClientConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub creation: CreationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Record store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Required when the backend is postgres
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Avatar cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    /// Directory holding content-addressed blobs
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Number of blobs kept in memory
    #[serde(default = "default_memory_cache_capacity")]
    pub memory_cache_capacity: u64,
}

/// User creation workflow settings
#[derive(Debug, Clone, Deserialize)]
pub struct CreationConfig {
    /// Publish and notify on a background task instead of inside the request
    #[serde(default = "default_true")]
    pub background_side_effects: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_storage_dir() -> String {
    "./avatars".to_string()
}

fn default_memory_cache_capacity() -> u64 {
    256
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            memory_cache_capacity: default_memory_cache_capacity(),
        }
    }
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            background_side_effects: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
