//! Tracer provider setup.
//!
//! With an OTLP endpoint configured (and a Tokio runtime to drive the batch
//! exporter) spans are shipped to the collector. Otherwise spans are still
//! recorded, so log correlation keeps working, but nothing is exported.

use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::{Config as TraceConfig, TracerProvider};
use opentelemetry_sdk::Resource;

use crate::config::Config;

/// Instrumentation scope name used for the logger's tracer.
pub const TRACER_NAME: &str = "apmlog";

/// Build the tracer provider described by `config`.
///
/// Never fails: exporter problems are logged and fall back to a provider
/// without export.
pub fn tracer_provider(config: &Config) -> TracerProvider {
    if let Some(endpoint) = config.otel_endpoint.as_deref() {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(endpoint, "No Tokio runtime available, OTLP span export disabled");
        } else {
            use opentelemetry_otlp::{Protocol, WithExportConfig};

            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint)
                .with_protocol(Protocol::Grpc);

            match opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(trace_config(config))
                .install_batch(opentelemetry_sdk::runtime::Tokio)
            {
                Ok(provider) => {
                    tracing::info!(endpoint, "OTLP span exporter configured");
                    return provider;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create OTLP exporter, spans will not be exported");
                }
            }
        }
    }

    TracerProvider::builder()
        .with_config(trace_config(config))
        .build()
}

fn trace_config(config: &Config) -> TraceConfig {
    TraceConfig::default().with_resource(service_resource(&config.service_name))
}

fn service_resource(service_name: &str) -> Resource {
    if service_name.is_empty() {
        Resource::default()
    } else {
        Resource::new([KeyValue::new("service.name", service_name.to_string())])
    }
}
