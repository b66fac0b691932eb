//! Apmlog demo: emits a few records the way a service would.
//!
//! # Usage
//!
//! ```bash
//! apmlog-demo --service-name billing --pretty-print true
//! ```
//!
//! Environment variables can also be used:
//! - `PRETTY_PRINT_LOGGER`: Indented JSON output
//! - `SERVICE_NAME`: Service name on context-aware records
//! - `LOG_LEVEL`: Minimum level (trace, debug, info, warn, error)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector for span export

use apmlog::{install_panic_hook, Config, Context, Level, Logger};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Body {
    #[serde(rename = "Name")]
    name: String,
}

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Apmlog v{} - Structured Logging Demo

  Configuration:
    Service:      {}
    Log Level:    {}
    Pretty Print: {}
    OTLP:         {}
"#,
        version,
        config.service_name,
        config.level(),
        config.pretty_print,
        config.otel_endpoint.as_deref().unwrap_or("disabled"),
    );
}

#[inline(never)]
fn handle_order(logger: &Logger, ctx: &Context) {
    let body = Body {
        name: "anis".into(),
    };
    logger.error_with_context(ctx, &body, &(), "ganbate");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();
    print_banner(&config);

    let logger: &'static Logger = Box::leak(Box::new(Logger::builder(config).build()));
    logger.install()?;
    install_panic_hook(logger);

    let ctx = Context::background().with_trace_id("111222121");
    handle_order(logger, &ctx);

    logger.info("service started");
    logger.debug("hidden unless LOG_LEVEL=debug");

    // Errors inside a span are recorded on that span
    let request_ctx = Context::background().with_new_trace_id();
    tracing::info_span!("checkout", trace_id = request_ctx.trace_id()).in_scope(|| {
        logger.warn_with_context(&request_ctx, "POST /checkout", &(), "payment retry");
        logger.error("payment provider unavailable");
    });

    logger.set_level(Level::Warn);
    logger.info("suppressed after raising the level");
    logger.warn("level raised to warning");

    logger.flush()?;
    Ok(())
}
