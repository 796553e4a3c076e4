//! Prometheus metrics infrastructure

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use super::config::MetricsConfig;

const AVATAR_BLOB_SIZE: &str = "avatar_blob_size_bytes";

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(AVATAR_BLOB_SIZE.to_string()),
        &config.avatar_size_buckets,
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!("Invalid avatar size buckets: {}", e);
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    // Register default metrics with initial values
    gauge!("avatar_directory_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_str = status.to_string();
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status_str),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    // Track 5xx errors separately
    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record an avatar lookup served from the cache
pub fn record_avatar_cache_hit() {
    counter!("avatar_cache_hits_total").increment(1);
}

/// Record an avatar lookup that had to go upstream
pub fn record_avatar_cache_miss() {
    counter!("avatar_cache_misses_total").increment(1);
}

pub fn record_avatar_blob_written(size: usize) {
    counter!("avatar_blobs_written_total").increment(1);
    histogram!(AVATAR_BLOB_SIZE).record(size as f64);
}

pub fn record_avatar_blob_deleted() {
    counter!("avatar_blobs_deleted_total").increment(1);
}

/// Record the outcome of an event publish, after retries
pub fn record_event_publish(event_type: &str, success: bool) {
    let labels = [("event_type", event_type.to_string())];

    if success {
        counter!("events_published_total", &labels).increment(1);
    } else {
        counter!("event_publish_failures_total", &labels).increment(1);
    }
}

/// Record the outcome of an email dispatch, after retries
pub fn record_email(transport: &str, delivered: bool) {
    let labels = [("transport", transport.to_string())];

    if delivered {
        counter!("emails_sent_total", &labels).increment(1);
    } else {
        counter!("emails_dead_lettered_total", &labels).increment(1);
    }
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("uuid pattern is valid")
    });
    static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"/\d+(/|$)").expect("numeric id pattern is valid")
    });

    let path = UUID_RE.replace_all(path, "{id}");
    let path = NUMERIC_RE.replace_all(&path, "/{id}$1");

    // Truncate long paths
    if path.len() > 50 {
        path[..50].to_string()
    } else {
        path.to_string()
    }
}
