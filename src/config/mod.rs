//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AvatarConfig, CreationConfig, LogFormat, LoggingConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
