use thiserror::Error;

/// Core domain errors
///
/// `PublishFailed` and `NotificationFailed` are side-channel failures: the
/// creation workflow logs them and never surfaces them as the request's result.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cache corrupted: {message}")]
    CacheCorrupted { message: String },

    #[error("Publish failed: {message}")]
    PublishFailed { message: String },

    #[error("Notification failed: {message}")]
    NotificationFailed { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn cache_corrupted(message: impl Into<String>) -> Self {
        Self::CacheCorrupted {
            message: message.into(),
        }
    }

    pub fn publish_failed(message: impl Into<String>) -> Self {
        Self::PublishFailed {
            message: message.into(),
        }
    }

    pub fn notification_failed(message: impl Into<String>) -> Self {
        Self::NotificationFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error belongs to a side channel that must not fail a request
    pub fn is_side_channel(&self) -> bool {
        matches!(
            self,
            Self::PublishFailed { .. } | Self::NotificationFailed { .. }
        )
    }
}
