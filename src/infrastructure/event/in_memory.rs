use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::event::{CreationEvent, EventPublisher};
use crate::domain::DomainError;

/// Publisher that records events in memory
///
/// Used when no broker is configured and in tests.
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<CreationEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn published(&self) -> Vec<CreationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &CreationEvent) -> Result<(), DomainError> {
        debug!(event_type = %event.event_type, "Recorded event in memory");

        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        Ok(())
    }
}
