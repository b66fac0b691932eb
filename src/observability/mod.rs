//! OpenTelemetry APM integration.
//!
//! Provides:
//! - Tracer provider setup with optional OTLP export
//! - A hook layer reporting error records to the APM backend
//! - A panic hook that routes panics through the logger

pub mod apm;
pub mod panic;
pub mod provider;
