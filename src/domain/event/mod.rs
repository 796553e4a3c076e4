//! Creation events and the publisher port

mod entity;
mod publisher;

pub use entity::{CreationEvent, EventType};
pub use publisher::EventPublisher;

#[cfg(test)]
pub use publisher::MockEventPublisher;
