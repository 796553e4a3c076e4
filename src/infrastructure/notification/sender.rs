//! Best-effort email dispatch with bounded retry

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::notification::{EmailMessage, MailTransport};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_email;
use crate::infrastructure::retry::RetryPolicy;

/// Sends email through a transport, retrying with backoff
///
/// After the last attempt the message is dead-lettered to the error log and
/// the caller receives `NotificationFailed`.
#[derive(Clone)]
pub struct NotificationSender {
    transport: Arc<dyn MailTransport>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for NotificationSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSender")
            .field("transport", &self.transport.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl NotificationSender {
    pub fn new(transport: Arc<dyn MailTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), DomainError> {
        self.send(&EmailMessage::new(to, subject, body)).await
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let transport = self.transport.name();
        let mut last_error = None;

        for (attempt, delay) in self.retry.delays().enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            match self.transport.send(message).await {
                Ok(()) => {
                    debug!(to = %message.to, transport, attempt = attempt + 1, "Email sent");
                    record_email(transport, true);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        to = %message.to,
                        transport,
                        attempt = attempt + 1,
                        error = %e,
                        "Email attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();

        error!(
            to = %message.to,
            subject = %message.subject,
            transport,
            reason = %reason,
            "Email dead-lettered"
        );
        record_email(transport, false);

        Err(DomainError::notification_failed(format!(
            "Failed to deliver email to {}: {}",
            message.to, reason
        )))
    }
}
