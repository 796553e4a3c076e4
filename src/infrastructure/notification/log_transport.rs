use async_trait::async_trait;
use tracing::info;

use crate::domain::notification::{EmailMessage, MailTransport};
use crate::domain::DomainError;

/// Transport that only logs outgoing mail
#[derive(Debug, Clone, Default)]
pub struct LogMailTransport {
    from: String,
}

impl LogMailTransport {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Email dispatched to log transport"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
