//! Apmlog: structured JSON logging with caller attribution and APM correlation.
//!
//! Every record is one JSON object on stdout carrying the level, message,
//! timestamp and the application function and `file:line` that logged it.
//! Context-aware emitters add the request's trace id, request and response
//! payloads and the service name. Error records are forwarded to the APM
//! backend through OpenTelemetry.
//!
//! # Architecture
//!
//! - **Caller attribution**: the formatter walks the stack past the logger's
//!   own frames and the `tracing` machinery to find the calling function
//! - **Facade**: a small `info`/`debug`/`warn`/`error` API, with and without
//!   a request [`Context`]
//! - **APM**: records are mirrored into active OpenTelemetry spans; errors
//!   outside any span are reported as standalone error spans
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`context`]: Request-scoped context and the trace id key
//! - [`format`]: JSON record rendering
//! - [`frame`]: Caller frame resolution
//! - [`logger`]: The logging facade
//! - [`observability`]: Tracer provider, APM hook and panic hook
//!
//! # Example
//!
//! ```no_run
//! use apmlog::{Config, Context, Logger};
//!
//! let logger = Logger::builder(Config::from_env()).build();
//! let ctx = Context::background().with_trace_id("111222121");
//! logger.error_with_context(&ctx, "GET /orders/7", &(), "order lookup failed");
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // logger::LoggerBuilder is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod frame;
pub mod level;
pub mod logger;
pub mod observability;

pub use config::Config;
pub use context::{new_trace_id, Context, ContextKey, TRACE_ID};
pub use error::{Error, Result};
pub use frame::{AttributionStrategy, CallerFrame, NoAttribution, StackAttribution};
pub use level::Level;
pub use logger::{
    debug, debug_with_context, error, error_with_context, info, info_with_context, set_level,
    warn, warn_with_context, LazyLogger, Logger, LoggerBuilder,
};
pub use observability::panic::install_panic_hook;
