use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::CreationEvent;
use crate::domain::DomainError;

/// Durable event emitter
///
/// Delivery is at-least-once: an event accepted by the broker survives a
/// broker restart, and a retried publish may deliver it more than once.
/// Consumers must be idempotent on the event's subject id.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event, retrying transient failures up to the configured
    /// limit before failing with `PublishFailed`
    async fn publish(&self, event: &CreationEvent) -> Result<(), DomainError>;

    /// Whether the broker link is currently usable
    async fn is_connected(&self) -> bool {
        true
    }
}
