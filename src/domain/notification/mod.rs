//! Email notifications

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// A single outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Welcome message sent after a user is created
    pub fn welcome(to: impl Into<String>, first_name: Option<&str>) -> Self {
        let greeting = match first_name {
            Some(name) => format!("Hello {},", name),
            None => "Hello,".to_string(),
        };

        Self::new(
            to,
            "Welcome!",
            format!("{}\n\nYour account has been created. Welcome aboard!", greeting),
        )
    }
}

/// Mail delivery collaborator
///
/// A single call is one delivery attempt; retry policy lives in the sender.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError>;

    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;
}
