//! Logging and trace export setup

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    TravelianError,
    config::{LoggingConfig, TelemetryConfig},
};

/// Handle kept alive for the lifetime of the process
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Flush pending spans
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down trace exporter: {e}");
            }
        }
    }
}

/// Build the log filter: `RUST_LOG` wins over the configured level
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber.
///
/// Logs go to stdout as pretty text or JSON lines. When an OTLP endpoint is
/// configured, spans are also exported over HTTP.
pub fn init(logging: &LoggingConfig, telemetry: &TelemetryConfig) -> crate::Result<Telemetry> {
    let fmt_layer = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    let provider = match telemetry.otlp_endpoint.as_deref() {
        Some(endpoint) => Some(tracer_provider(endpoint, &telemetry.service_name)?),
        None => None,
    };
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(telemetry.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(env_filter(&logging.level))
        .try_init()
        .map_err(|e| TravelianError::config(format!("Failed to install log subscriber: {e}")))?;

    if let Some(endpoint) = telemetry.otlp_endpoint.as_deref() {
        tracing::info!(endpoint, "exporting traces over OTLP");
    }
    Ok(Telemetry { provider })
}

fn tracer_provider(endpoint: &str, service_name: &str) -> crate::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TravelianError::config(format!("Failed to create OTLP exporter: {e}")))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_used_without_rust_log() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter("debug").to_string(), "debug");
        }
    }
}
