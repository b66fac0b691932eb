//! APM hook layer.
//!
//! Error records emitted inside a span are mirrored into that span by the
//! `tracing-opentelemetry` layer, which also marks the span as failed. Error
//! records with no span to attach to are reported here instead, as a
//! standalone `log.error` span carrying the message and request fields.

use opentelemetry::trace::{Span as _, Status, Tracer as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::Tracer;
use serde_json::Value;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::format::FieldCollector;

/// Name of the span reported for an error outside any span.
pub const ERROR_SPAN_NAME: &str = "log.error";

/// Layer forwarding orphan error records to the APM backend.
#[derive(Debug, Clone)]
pub struct ApmHook {
    tracer: Tracer,
}

impl ApmHook {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

impl<S> Layer<S> for ApmHook
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        if *event.metadata().level() != tracing::Level::ERROR || ctx.event_span(event).is_some() {
            return;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let message = collector.message.unwrap_or_default();

        let mut span = self.tracer.start(ERROR_SPAN_NAME);
        span.set_attribute(KeyValue::new("log.message", message.clone()));
        span.set_attribute(KeyValue::new("log.target", event.metadata().target()));
        for (key, attribute) in [("trace_id", "log.trace_id"), ("service_name", "log.service_name")] {
            if let Some(Value::String(value)) = collector.fields.get(key) {
                if !value.is_empty() {
                    span.set_attribute(KeyValue::new(attribute, value.clone()));
                }
            }
        }
        span.set_status(Status::error(message));
        span.end();
    }
}
