//! AMQP event publisher

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::event::{CreationEvent, EventPublisher};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_event_publish;
use crate::infrastructure::retry::RetryPolicy;

/// Default exchange: routes by queue name
const DEFAULT_EXCHANGE: &str = "";
const PERSISTENT: u8 = 2;

/// Message broker settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound on opening the connection and channel
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_url() -> String {
    "amqp://localhost:5672/%2f".to_string()
}

fn default_queue() -> String {
    "user_queue".to_string()
}

fn default_max_attempts() -> usize {
    5
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            queue: default_queue(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl BrokerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.initial_delay_ms, self.max_delay_ms)
    }
}

struct Link {
    _connection: Connection,
    channel: Channel,
}

impl Link {
    fn is_usable(&self) -> bool {
        self.channel.status().connected()
    }
}

/// Publishes creation events to a durable queue
///
/// One connection and confirm-mode channel are shared by all publishes and
/// re-established lazily after a failure. A publish succeeds only once the
/// broker confirms it; persistent delivery plus a durable queue keep accepted
/// events across broker restarts. Retries may duplicate a message, so
/// delivery is at-least-once.
pub struct AmqpEventPublisher {
    url: String,
    queue: String,
    retry: RetryPolicy,
    connect_timeout: Duration,
    link: RwLock<Option<Arc<Link>>>,
}

impl std::fmt::Debug for AmqpEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpEventPublisher")
            .field("queue", &self.queue)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl AmqpEventPublisher {
    /// Create a publisher; the broker is contacted on first use
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            queue: config.queue.clone(),
            retry: config.retry_policy(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            link: RwLock::new(None),
        }
    }

    /// Create a publisher and open the broker link up front
    pub async fn connect(config: &BrokerConfig) -> Result<Self, DomainError> {
        let publisher = Self::new(config);
        publisher.channel().await?;
        Ok(publisher)
    }

    async fn channel(&self) -> Result<Arc<Link>, DomainError> {
        if let Some(link) = self.link.read().await.as_ref() {
            if link.is_usable() {
                return Ok(Arc::clone(link));
            }
        }

        let mut slot = self.link.write().await;

        // Another publish may have reconnected while we waited
        if let Some(link) = slot.as_ref() {
            if link.is_usable() {
                return Ok(Arc::clone(link));
            }
        }

        let link = tokio::time::timeout(self.connect_timeout, self.open())
            .await
            .map_err(|_| {
                DomainError::publish_failed(format!(
                    "Timed out connecting after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })??;
        let link = Arc::new(link);
        *slot = Some(Arc::clone(&link));

        Ok(link)
    }

    async fn open(&self) -> Result<Link, DomainError> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| DomainError::publish_failed(format!("Failed to connect: {}", e)))?;

        let channel = connection.create_channel().await.map_err(|e| {
            DomainError::publish_failed(format!("Failed to create channel: {}", e))
        })?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| {
                DomainError::publish_failed(format!("Failed to enable confirms: {}", e))
            })?;

        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                DomainError::publish_failed(format!("Failed to declare queue: {}", e))
            })?;

        info!(queue = %self.queue, "Connected to AMQP broker");

        Ok(Link {
            _connection: connection,
            channel,
        })
    }

    async fn reset(&self, failed: &Arc<Link>) {
        clear_if_current(&mut *self.link.write().await, failed);
    }

    async fn publish_once(&self, payload: &[u8]) -> Result<(), DomainError> {
        let link = self.channel().await?;
        let result = self.publish_on(&link, payload).await;

        if result.is_err() {
            self.reset(&link).await;
        }

        result
    }

    async fn publish_on(&self, link: &Link, payload: &[u8]) -> Result<(), DomainError> {
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);

        let confirm = link
            .channel
            .basic_publish(
                DEFAULT_EXCHANGE,
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|e| DomainError::publish_failed(format!("Failed to publish: {}", e)))?;

        let confirmation = confirm.await.map_err(|e| {
            DomainError::publish_failed(format!("Publish confirmation failed: {}", e))
        })?;

        if confirmation.is_nack() {
            return Err(DomainError::publish_failed("Broker rejected the message"));
        }

        Ok(())
    }
}

/// Empty the slot only if it still holds `failed`; a newer link stays
fn clear_if_current<T>(slot: &mut Option<Arc<T>>, failed: &Arc<T>) -> bool {
    if slot
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, failed))
    {
        slot.take();
        return true;
    }

    false
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
    #[tracing::instrument(name = "event.publish", skip_all, fields(event_type = %event.event_type))]
    async fn publish(&self, event: &CreationEvent) -> Result<(), DomainError> {
        let payload = event
            .to_bytes()
            .map_err(|e| DomainError::internal(format!("Failed to encode event: {}", e)))?;

        let mut last_error = None;

        for (attempt, delay) in self.retry.delays().enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            match self.publish_once(&payload).await {
                Ok(()) => {
                    debug!(queue = %self.queue, attempt = attempt + 1, "Published event");
                    record_event_publish(event.event_type.as_str(), true);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Publish attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        record_event_publish(event.event_type.as_str(), false);

        Err(DomainError::publish_failed(format!(
            "Giving up after {} attempts: {}",
            self.retry.max_attempts.max(1),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn is_connected(&self) -> bool {
        self.link
            .read()
            .await
            .as_ref()
            .is_some_and(|link| link.is_usable())
    }
}
