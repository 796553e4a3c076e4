//! Event publisher implementations

mod amqp;
mod in_memory;

pub use amqp::{AmqpEventPublisher, BrokerConfig};
pub use in_memory::InMemoryEventPublisher;
