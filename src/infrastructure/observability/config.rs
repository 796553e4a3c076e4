//! Observability configuration

use opentelemetry_sdk::trace::Sampler;
use serde::Deserialize;

/// Tracing export and Prometheus settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// OpenTelemetry span export
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OTLP gRPC endpoint
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Reported as the `deployment.environment` resource attribute
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Fraction of traces kept, clamped to 0.0..=1.0
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

impl TracingConfig {
    pub fn sampler(&self) -> Sampler {
        if self.sampling_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sampling_ratio <= 0.0 || self.sampling_ratio.is_nan() {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sampling_ratio)
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
    /// Histogram buckets for the size of newly stored avatar blobs, in bytes
    #[serde(default = "default_avatar_size_buckets")]
    pub avatar_size_buckets: Vec<f64>,
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "avatar-directory".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_avatar_size_buckets() -> Vec<f64> {
    vec![
        1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0,
    ]
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            environment: default_environment(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
            avatar_size_buckets: default_avatar_size_buckets(),
        }
    }
}
