//! JSON mail relay transport

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::config::MailConfig;
use crate::domain::notification::{EmailMessage, MailTransport};
use crate::domain::DomainError;

/// Delivers mail by POSTing JSON to a relay endpoint
#[derive(Debug, Clone)]
pub struct HttpMailTransport {
    client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailTransport {
    pub fn new(config: &MailConfig) -> Result<Self, DomainError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| DomainError::configuration("mail.endpoint is required for http transport"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            auth_header: config.api_key.as_ref().map(|key| format!("Bearer {}", key)),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let body = RelayRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);

        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::notification_failed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();

            return Err(DomainError::notification_failed(format!(
                "HTTP {}: {}",
                status, error_body
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> MailConfig {
        MailConfig {
            endpoint: Some(format!("{}/send", server.uri())),
            api_key: Some("relay-key".to_string()),
            from: "noreply@example.com".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_posts_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("Authorization", "Bearer relay-key"))
            .and(body_json(serde_json::json!({
                "from": "noreply@example.com",
                "to": "ada@example.com",
                "subject": "Welcome!",
                "text": "hi"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpMailTransport::new(&config(&server)).unwrap();
        let message = EmailMessage::new("ada@example.com", "Welcome!", "hi");

        transport.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay down"))
            .mount(&server)
            .await;

        let transport = HttpMailTransport::new(&config(&server)).unwrap();
        let result = transport
            .send(&EmailMessage::new("ada@example.com", "s", "b"))
            .await;

        assert!(matches!(result, Err(DomainError::NotificationFailed { .. })));
    }

    #[test]
    fn test_endpoint_required() {
        let result = HttpMailTransport::new(&MailConfig::default());
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
