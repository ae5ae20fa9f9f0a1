use crate::error::{DuckAskError, Result};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::Resource;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub struct OtelGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            // flush remaining spans on shutdown
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn flag_enabled(value: &str) -> bool {
    let v = value.to_lowercase();
    v == "1" || v == "true" || v == "yes"
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// Install the global subscriber.
///
/// Logs go to stderr through the fmt layer. Spans are exported over OTLP only
/// when `DUCKASK_ENABLE_TRACING` is truthy and a collector endpoint is set.
pub fn init_tracing(service_name: &str) -> Result<OtelGuard> {
    let enabled = env::var("DUCKASK_ENABLE_TRACING")
        .map(|v| flag_enabled(&v))
        .unwrap_or(false);

    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|s| !s.is_empty());

    let endpoint_url = match endpoint {
        Some(url) if enabled => url,
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .finish()
                .try_init()
                .map_err(|e| DuckAskError::Tracing(e.to_string()))?;

            tracing::debug!("basic logging initialized (service={})", service_name);

            return Ok(OtelGuard {
                tracer_provider: None,
            });
        }
    };

    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint_url)
        .build()
        .map_err(|e| DuckAskError::Tracing(format!("exporter build failed: {}", e)))?;

    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new("service.name", service_name.to_string()))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()
        .map_err(|e| DuckAskError::Tracing(e.to_string()))?;

    tracing::info!(
        "opentelemetry tracing initialized for {} (endpoint: {})",
        service_name,
        endpoint_url
    );

    Ok(OtelGuard {
        tracer_provider: Some(provider),
    })
}
