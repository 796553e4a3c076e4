//! End-to-end user creation and avatar lifecycle against a stubbed upstream

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use avatar_directory::api::{create_router_with_state, AppState};
use avatar_directory::domain::{
    DomainError, EmailMessage, MailTransport, UserRecord, UserRepository,
};
use avatar_directory::infrastructure::avatar::{AvatarCache, FsBlobStore, Sha256Hasher};
use avatar_directory::infrastructure::directory::{DirectoryClientConfig, HttpDirectoryClient};
use avatar_directory::infrastructure::event::InMemoryEventPublisher;
use avatar_directory::infrastructure::notification::NotificationSender;
use avatar_directory::infrastructure::retry::RetryPolicy;
use avatar_directory::infrastructure::services::UserCreationService;
use avatar_directory::infrastructure::storage::InMemoryStorage;
use avatar_directory::infrastructure::user::StorageUserRepository;

/// Transport that fails every delivery attempt
#[derive(Default)]
struct FailingTransport {
    attempts: AtomicUsize,
}

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _message: &EmailMessage) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::notification_failed("mail relay unreachable"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct Harness {
    router: Router,
    users: Arc<dyn UserRepository>,
    publisher: Arc<InMemoryEventPublisher>,
    transport: Arc<FailingTransport>,
    blob_dir: TempDir,
    _upstream: MockServer,
}

fn image() -> Vec<u8> {
    (0u8..50).collect()
}

async fn harness() -> Harness {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/999999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .with_priority(1)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/api/users/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 1,
                "email": "ada@example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "avatar": format!("{}/img/ada.png", upstream.uri())
            }
        })))
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/ada.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image()))
        .mount(&upstream)
        .await;

    let directory = Arc::new(
        HttpDirectoryClient::new(&DirectoryClientConfig {
            base_url: upstream.uri(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap(),
    );

    let users: Arc<dyn UserRepository> = Arc::new(StorageUserRepository::new(Arc::new(
        InMemoryStorage::<UserRecord>::new(),
    )));
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let transport = Arc::new(FailingTransport::default());
    let blob_dir = TempDir::new().unwrap();

    let user_service = UserCreationService::new(
        users.clone(),
        directory.clone(),
        publisher.clone(),
        NotificationSender::new(
            transport.clone(),
            RetryPolicy::new(3, 1, 5).without_jitter(),
        ),
    )
    .with_background_side_effects(false);

    let avatar_cache = AvatarCache::new(
        users.clone(),
        directory,
        Arc::new(FsBlobStore::new(blob_dir.path())),
        Arc::new(Sha256Hasher),
        16,
    );

    let state = AppState::new(user_service, avatar_cache, users.clone(), publisher.clone());

    Harness {
        router: create_router_with_state(state),
        users,
        publisher,
        transport,
        blob_dir,
        _upstream: upstream,
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn blob_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn create_fetch_and_delete_avatar() {
    let h = harness().await;

    let create = Request::builder()
        .method("POST")
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"name": "Ada", "email": "ada@example.com"}).to_string(),
        ))
        .unwrap();

    let (status, body) = call(&h.router, create).await;
    assert_eq!(status, StatusCode::CREATED);

    let created: Value = serde_json::from_slice(&body).unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    // Mail failed on every attempt, the creation still succeeded and was announced
    assert_eq!(h.transport.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(h.publisher.published().len(), 1);

    let (status, body) = call(&h.router, get(&format!("/api/user/{}/avatar", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(STANDARD.decode(&body).unwrap(), image());

    let digest = hex::encode(Sha256::digest(image()));
    assert_eq!(blob_files(&h.blob_dir), vec![digest.clone()]);

    let record = h
        .users
        .get(&avatar_directory::domain::UserId::new(id.clone()).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.avatar_hash().map(|hash| hash.to_string()), Some(digest.clone()));

    let (status, body) = call(&h.router, delete(&format!("/api/user/{}/avatar", id))).await;
    assert_eq!(status, StatusCode::OK);

    let deleted: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(deleted["hash"], digest);
    assert!(blob_files(&h.blob_dir).is_empty());

    let (status, _) = call(&h.router, delete(&format!("/api/user/{}/avatar", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_upstream_user_has_no_side_effects() {
    let h = harness().await;

    let (status, _) = call(&h.router, get("/api/user/999999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&h.router, get("/api/user/999999/avatar")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = avatar_directory::domain::UserId::new("999999").unwrap();
    assert!(h.users.get(&id).await.unwrap().is_none());
    assert!(blob_files(&h.blob_dir).is_empty());
    assert!(h.publisher.published().is_empty());
}

#[tokio::test]
async fn identical_images_share_one_blob() {
    let h = harness().await;

    for id in ["1", "2"] {
        let (status, _) = call(&h.router, get(&format!("/api/user/{}/avatar", id))).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(blob_files(&h.blob_dir).len(), 1);

    let (status, _) = call(&h.router, delete("/api/user/1/avatar")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(blob_files(&h.blob_dir).len(), 1);

    let (status, body) = call(&h.router, get("/api/user/2/avatar")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(STANDARD.decode(&body).unwrap(), image());

    let (status, _) = call(&h.router, delete("/api/user/2/avatar")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(blob_files(&h.blob_dir).is_empty());
}
