//! Logger configuration.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variables (`PRETTY_PRINT_LOGGER`, `SERVICE_NAME`, ...)
//! - Lenient parsing: malformed values fall back to defaults, never fail

use std::convert::Infallible;

use clap::{ArgAction, Parser};

use crate::level::Level;

/// Structured JSON logger with caller attribution and APM correlation.
#[derive(Parser, Debug, Clone)]
#[command(name = "apmlog")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Emit indented multi-line JSON instead of one object per line
    #[arg(
        long,
        env = "PRETTY_PRINT_LOGGER",
        action = ArgAction::Set,
        value_parser = parse_bool_lenient,
        default_value = "false"
    )]
    pub pretty_print: bool,

    /// Service name attached to context-aware records
    #[arg(long, env = "SERVICE_NAME", default_value = "")]
    pub service_name: String,

    /// Minimum level to emit (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Omit the `time` key from records
    #[arg(
        long,
        env = "LOG_DISABLE_TIMESTAMP",
        action = ArgAction::Set,
        value_parser = parse_bool_lenient,
        default_value = "false"
    )]
    pub disable_timestamp: bool,

    /// OpenTelemetry collector endpoint for span export (optional)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Read configuration from the environment only.
    ///
    /// Never fails: anything clap rejects yields [`Config::default`].
    pub fn from_env() -> Self {
        Self::try_parse_from(["apmlog"]).unwrap_or_default()
    }

    /// The configured minimum level, `info` when unparseable.
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pretty_print: false,
            service_name: String::new(),
            log_level: "info".into(),
            disable_timestamp: false,
            otel_endpoint: None,
        }
    }
}

/// Parse a boolean: `1`, `t`, `T`, `TRUE`, `true` and `True` are true.
///
/// Anything else is `false`.
pub fn parse_bool_lenient(value: &str) -> Result<bool, Infallible> {
    Ok(matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True"))
}
