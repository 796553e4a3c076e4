//! Upstream directory port

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(test)]
use mockall::automock;

use crate::domain::user::{UserId, UserProfile};
use crate::domain::DomainError;

/// Read access to the upstream user directory
///
/// Implementations map an upstream "not found" to `NotFound` and every other
/// failure (non-success status, timeout, transport error) to
/// `UpstreamUnavailable`. They never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Look up a user profile by identifier
    async fn lookup(&self, id: &UserId) -> Result<UserProfile, DomainError>;

    /// Fetch raw bytes from a URL, typically an avatar image
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, DomainError>;
}
