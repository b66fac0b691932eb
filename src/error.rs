//! Error type for the fallible setup operations.
//!
//! Emission itself never fails: attribution and context problems degrade to
//! missing metadata. Only wiring the logger into the process can error.

use thiserror::Error;

/// Errors returned by logger setup and maintenance operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A level name did not match any known severity.
    #[error("not a valid log level: {0:?}")]
    InvalidLevel(String),

    /// Another dispatcher was already installed as the global default.
    #[error("a global tracing dispatcher is already installed")]
    AlreadyInstalled(#[from] tracing::dispatcher::SetGlobalDefaultError),

    /// The tracer provider failed to flush or export spans.
    #[error("APM export failed: {0}")]
    Apm(#[from] opentelemetry::trace::TraceError),
}

/// Result alias for setup operations.
pub type Result<T> = std::result::Result<T, Error>;
