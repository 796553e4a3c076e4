//! OpenTelemetry distributed tracing setup

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, TracerProvider},
    Resource,
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use super::config::TracingConfig;
use crate::config::LogFormat;
use crate::infrastructure::logging::LoggingConfig;

/// Initialize tracing with optional OpenTelemetry export
pub fn init_tracing(logging_config: &LoggingConfig, tracing_config: &TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging_config.level));

    match &logging_config.format {
        LogFormat::Json => init_json_tracing(filter, tracing_config),
        LogFormat::Pretty => init_pretty_tracing(filter, tracing_config),
    }
}

fn init_json_tracing(filter: EnvFilter, tracing_config: &TracingConfig) {
    let fmt_layer = fmt::layer()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    install(filter, fmt_layer, tracing_config);
}

fn init_pretty_tracing(filter: EnvFilter, tracing_config: &TracingConfig) {
    let fmt_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    install(filter, fmt_layer, tracing_config);
}

fn install<L>(filter: EnvFilter, fmt_layer: L, tracing_config: &TracingConfig)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(fmt_layer).with(filter);

    if !tracing_config.enabled {
        registry.init();
        tracing::info!("Tracing initialized (OpenTelemetry disabled)");
        return;
    }

    match init_otel_tracing(tracing_config) {
        Ok(tracer_provider) => {
            let tracer = tracer_provider.tracer(tracing_config.service_name.clone());
            opentelemetry::global::set_tracer_provider(tracer_provider);

            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();

            tracing::info!(
                endpoint = %tracing_config.otlp_endpoint,
                "Tracing initialized with OpenTelemetry export"
            );
        }
        Err(e) => {
            registry.init();
            tracing::warn!(error = %e, "Failed to initialize OpenTelemetry, export disabled");
        }
    }
}

fn init_otel_tracing(
    config: &TracingConfig,
) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    Ok(provider)
}

/// Shutdown tracing and flush pending spans
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.sampling_ratio, 1.0);
    }
}
