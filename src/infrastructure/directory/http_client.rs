//! HTTP client for a reqres-style user directory

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::domain::directory::DirectoryClient;
use crate::domain::user::{UserId, UserProfile};
use crate::domain::DomainError;

const API_KEY_HEADER: &str = "x-api-key";

/// Upstream directory connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Largest resource body `fetch_bytes` will buffer
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_base_url() -> String {
    "https://reqres.in".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for DirectoryClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Directory client talking to `GET {base_url}/api/users/{id}`
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_body_bytes: usize,
}

impl HttpDirectoryClient {
    pub fn new(config: &DirectoryClientConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    fn user_url(&self, id: &UserId) -> String {
        format!("{}/api/users/{}", self.base_url, id)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);

        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    fn too_large(&self, url: &str) -> DomainError {
        DomainError::upstream_unavailable(format!(
            "Resource '{}' exceeds {} bytes",
            url, self.max_body_bytes
        ))
    }

    async fn send(&self, url: &str, subject: &str) -> Result<reqwest::Response, DomainError> {
        let response = self.request(url).send().await.map_err(|e| {
            DomainError::upstream_unavailable(format!("Request for {} failed: {}", subject, e))
        })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(DomainError::not_found(format!("{} not found upstream", subject)));
        }

        if !status.is_success() {
            return Err(DomainError::upstream_unavailable(format!(
                "Upstream returned HTTP {} for {}",
                status.as_u16(),
                subject
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn lookup(&self, id: &UserId) -> Result<UserProfile, DomainError> {
        let subject = format!("User '{}'", id);
        let response = self.send(&self.user_url(id), &subject).await?;

        let envelope: UserEnvelope = response.json().await.map_err(|e| {
            DomainError::upstream_unavailable(format!("Invalid directory response: {}", e))
        })?;

        debug!(user_id = %id, "Resolved user from upstream directory");

        Ok(envelope.data.into_profile())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, DomainError> {
        let mut response = self.send(url, &format!("Resource '{}'", url)).await?;

        if response
            .content_length()
            .is_some_and(|length| length > self.max_body_bytes as u64)
        {
            return Err(self.too_large(url));
        }

        let mut body = BytesMut::new();

        while let Some(chunk) = response.chunk().await.map_err(|e| {
            DomainError::upstream_unavailable(format!("Failed to read body of '{}': {}", url, e))
        })? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: UserDto,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: serde_json::Value,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    avatar: String,
}

impl UserDto {
    fn into_profile(self) -> UserProfile {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        UserProfile {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            avatar: self.avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpDirectoryClient {
        HttpDirectoryClient::new(&DirectoryClientConfig {
            base_url: server.uri(),
            timeout_secs: 2,
            api_key: None,
            max_body_bytes: 1024,
        })
        .unwrap()
    }

    fn user_id(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": 2,
                    "email": "janet.weaver@reqres.in",
                    "first_name": "Janet",
                    "last_name": "Weaver",
                    "avatar": "https://reqres.in/img/faces/2-image.jpg"
                }
            })))
            .mount(&server)
            .await;

        let profile = client_for(&server).lookup(&user_id("2")).await.unwrap();

        assert_eq!(profile.id, "2");
        assert_eq!(profile.first_name, "Janet");
        assert_eq!(profile.avatar, "https://reqres.in/img/faces/2-image.jpg");
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/999999"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let result = client_for(&server).lookup(&user_id("999999")).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).lookup(&user_id("1")).await;

        assert!(matches!(result, Err(DomainError::UpstreamUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_lookup_malformed_body_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = client_for(&server).lookup(&user_id("1")).await;

        assert!(matches!(result, Err(DomainError::UpstreamUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(&DirectoryClientConfig {
            base_url: server.uri(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let result = client.lookup(&user_id("1")).await;

        assert!(matches!(result, Err(DomainError::UpstreamUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/3"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "3", "email": "", "first_name": "", "last_name": "", "avatar": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(&DirectoryClientConfig {
            base_url: server.uri(),
            timeout_secs: 2,
            api_key: Some("secret".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(client.lookup(&user_id("3")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_raw_body() {
        let server = MockServer::start().await;
        let image: Vec<u8> = (0u8..50).collect();

        Mock::given(method("GET"))
            .and(path("/img/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(image.clone()))
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .fetch_bytes(&format!("{}/img/1.png", server.uri()))
            .await
            .unwrap();

        assert_eq!(bytes.as_ref(), image.as_slice());
    }

    #[tokio::test]
    async fn test_fetch_bytes_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch_bytes(&format!("{}/img/missing.png", server.uri()))
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_oversized_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/img/huge.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .fetch_bytes(&format!("{}/img/huge.png", server.uri()))
            .await;

        match result {
            Err(DomainError::UpstreamUnavailable { message }) => {
                assert!(message.contains("exceeds 1024 bytes"));
            }
            other => panic!("expected UpstreamUnavailable, got {:?}", other),
        }
    }
}
