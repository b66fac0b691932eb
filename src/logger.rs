//! The logging facade.
//!
//! A [`Logger`] owns a private `tracing` dispatcher made of:
//! - a reloadable level filter ([`Logger::set_level`])
//! - the `tracing-opentelemetry` layer, mirroring records into active spans
//! - the [`ApmHook`], reporting errors raised outside any span
//! - a `fmt` layer using [`CallerJsonFormat`] for stdout JSON lines
//!
//! Loggers are built explicitly with [`LoggerBuilder`] and passed to call
//! sites. For code that wants a process-wide instance, [`Logger::global`]
//! and the free functions ([`info`], [`error_with_context`], ...) build one
//! from the environment exactly once.

use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, OnceLock};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use serde::Serialize;
use serde_json::Value;
use tracing::dispatcher::{self, Dispatch};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, Registry};

use crate::config::Config;
use crate::context::Context;
use crate::error::Result;
use crate::format::CallerJsonFormat;
use crate::frame::{AttributionStrategy, StackAttribution};
use crate::level::Level;
use crate::observability::apm::ApmHook;
use crate::observability::provider::{tracer_provider, TRACER_NAME};

/// Target of every event the facade emits.
pub const TARGET: &str = "apmlog";

/// Fields attached by the `*_with_context` emitters.
struct RequestFields<'a> {
    trace_id: &'a str,
    request: String,
    response: String,
    service_name: &'a str,
}

macro_rules! dispatch_event {
    ($level:ident, $message:ident) => {
        tracing::event!(target: TARGET, tracing::Level::$level, "{}", $message)
    };
    ($level:ident, $message:ident, $fields:ident) => {
        tracing::event!(
            target: TARGET,
            tracing::Level::$level,
            trace_id = $fields.trace_id,
            request = $fields.request.as_str(),
            response = $fields.response.as_str(),
            service_name = $fields.service_name,
            "{}",
            $message
        )
    };
}

thread_local! {
    static EMITTING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a dispatch until dropped.
///
/// `tracing` cannot switch the default dispatcher while a dispatch on the
/// same thread is still running, so nested emissions are dropped instead.
struct EmitGuard;

impl EmitGuard {
    fn enter() -> Option<Self> {
        if EMITTING.with(|emitting| emitting.replace(true)) {
            None
        } else {
            Some(EmitGuard)
        }
    }
}

impl Drop for EmitGuard {
    fn drop(&mut self) {
        EMITTING.with(|emitting| emitting.set(false));
    }
}

/// Whether the current thread is in the middle of emitting a record.
///
/// True while a message is formatted or a layer runs, including while a
/// panic raised there is being reported.
pub(crate) fn is_emitting() -> bool {
    EMITTING.with(Cell::get)
}

/// Structured JSON logger with caller attribution and APM correlation.
pub struct Logger {
    dispatch: Dispatch,
    level: reload::Handle<LevelFilter, Registry>,
    service_name: String,
    tracer_provider: TracerProvider,
}

impl Logger {
    /// Start building a logger from `config`.
    pub fn builder(config: Config) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// Build a stdout logger configured from the environment.
    pub fn from_env() -> Self {
        LoggerBuilder::new(Config::from_env()).build()
    }

    /// The process-wide logger, built from the environment on first use.
    pub fn global() -> &'static Logger {
        GLOBAL.get()
    }

    /// Change the minimum level emitted.
    ///
    /// The filter sits behind the reload layer's lock, so emissions racing
    /// with this call see either the old or the new level.
    pub fn set_level(&self, level: Level) {
        // The handle only fails once the subscriber is dropped, and `self` owns it.
        let _ = self.level.modify(|filter| *filter = level.into());
    }

    /// The current minimum level.
    pub fn level(&self) -> Level {
        self.level
            .clone_current()
            .and_then(Level::from_filter)
            .unwrap_or_default()
    }

    /// Whether records at `level` are currently emitted.
    pub fn enabled(&self, level: Level) -> bool {
        self.level
            .clone_current()
            .and_then(Level::from_filter)
            .is_some_and(|minimum| level >= minimum)
    }

    /// The service name attached to context-aware records.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The dispatcher records are emitted through.
    ///
    /// Spans entered with this dispatcher as default are the ones records
    /// correlate with.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Make this logger the global `tracing` dispatcher.
    pub fn install(&self) -> Result<()> {
        dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }

    /// Export any spans still buffered by the tracer provider.
    pub fn flush(&self) -> Result<()> {
        for result in self.tracer_provider.force_flush() {
            result?;
        }
        Ok(())
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(Level::Info, &message, None);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(Level::Debug, &message, None);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(Level::Warn, &message, None);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(Level::Error, &message, None);
    }

    /// Emit at info with the context's trace id, request and response.
    pub fn info_with_context<Req, Resp>(
        &self,
        ctx: &Context,
        request: &Req,
        response: &Resp,
        message: impl fmt::Display,
    ) where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        self.emit_with_context(Level::Info, ctx, request, response, &message);
    }

    /// Emit at debug with the context's trace id, request and response.
    pub fn debug_with_context<Req, Resp>(
        &self,
        ctx: &Context,
        request: &Req,
        response: &Resp,
        message: impl fmt::Display,
    ) where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        self.emit_with_context(Level::Debug, ctx, request, response, &message);
    }

    /// Emit at warning with the context's trace id, request and response.
    pub fn warn_with_context<Req, Resp>(
        &self,
        ctx: &Context,
        request: &Req,
        response: &Resp,
        message: impl fmt::Display,
    ) where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        self.emit_with_context(Level::Warn, ctx, request, response, &message);
    }

    /// Emit at error with the context's trace id, request and response.
    pub fn error_with_context<Req, Resp>(
        &self,
        ctx: &Context,
        request: &Req,
        response: &Resp,
        message: impl fmt::Display,
    ) where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        self.emit_with_context(Level::Error, ctx, request, response, &message);
    }

    fn emit_with_context<Req, Resp>(
        &self,
        level: Level,
        ctx: &Context,
        request: &Req,
        response: &Resp,
        message: &dyn fmt::Display,
    ) where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        // Skip serializing payloads that would be filtered out anyway.
        if !self.enabled(level) {
            return;
        }

        let fields = RequestFields {
            trace_id: ctx.trace_id(),
            request: encode_json(request),
            response: encode_json(response),
            service_name: &self.service_name,
        };
        self.emit(level, message, Some(&fields));
    }

    fn emit(&self, level: Level, message: &dyn fmt::Display, fields: Option<&RequestFields<'_>>) {
        let Some(_guard) = EmitGuard::enter() else {
            return;
        };

        dispatcher::with_default(&self.dispatch, || match (level, fields) {
            (Level::Trace, None) => dispatch_event!(TRACE, message),
            (Level::Debug, None) => dispatch_event!(DEBUG, message),
            (Level::Info, None) => dispatch_event!(INFO, message),
            (Level::Warn, None) => dispatch_event!(WARN, message),
            (Level::Error, None) => dispatch_event!(ERROR, message),
            (Level::Trace, Some(fields)) => dispatch_event!(TRACE, message, fields),
            (Level::Debug, Some(fields)) => dispatch_event!(DEBUG, message, fields),
            (Level::Info, Some(fields)) => dispatch_event!(INFO, message, fields),
            (Level::Warn, Some(fields)) => dispatch_event!(WARN, message, fields),
            (Level::Error, Some(fields)) => dispatch_event!(ERROR, message, fields),
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

/// Serialize a payload to JSON text, describing the failure instead on error.
fn encode_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| Value::String(format!("unserializable payload: {e}")).to_string())
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    config: Config,
    writer: BoxMakeWriter,
    attribution: Arc<dyn AttributionStrategy>,
    tracer_provider: Option<TracerProvider>,
}

impl LoggerBuilder {
    /// Stdout output, stack attribution, tracer provider from `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            writer: BoxMakeWriter::new(std::io::stdout),
            attribution: Arc::new(StackAttribution::new()),
            tracer_provider: None,
        }
    }

    /// Write records somewhere other than stdout.
    #[must_use]
    pub fn writer<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.writer = BoxMakeWriter::new(writer);
        self
    }

    /// Replace the caller attribution strategy.
    #[must_use]
    pub fn attribution(mut self, attribution: impl AttributionStrategy + 'static) -> Self {
        self.attribution = Arc::new(attribution);
        self
    }

    /// Use an existing tracer provider instead of building one from config.
    #[must_use]
    pub fn tracer_provider(mut self, provider: TracerProvider) -> Self {
        self.tracer_provider = Some(provider);
        self
    }

    pub fn build(self) -> Logger {
        let provider = self
            .tracer_provider
            .unwrap_or_else(|| tracer_provider(&self.config));
        let tracer = provider.tracer(TRACER_NAME);

        let (filter, level) = reload::Layer::new(LevelFilter::from(self.config.level()));

        let format = CallerJsonFormat::new(self.attribution)
            .pretty(self.config.pretty_print)
            .with_timestamp(!self.config.disable_timestamp);

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_opentelemetry::layer().with_tracer(tracer.clone()))
            .with(ApmHook::new(tracer))
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(format)
                    .with_writer(self.writer),
            );

        Logger {
            dispatch: Dispatch::new(subscriber),
            level,
            service_name: self.config.service_name,
            tracer_provider: provider,
        }
    }
}

/// A logger built on first access, exactly once across threads.
pub struct LazyLogger {
    cell: OnceLock<Logger>,
    init: fn() -> Logger,
}

impl LazyLogger {
    pub const fn new(init: fn() -> Logger) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
        }
    }

    /// The logger, building it if this is the first access.
    ///
    /// Concurrent first accesses block until the single build completes.
    pub fn get(&self) -> &Logger {
        self.cell.get_or_init(self.init)
    }

    /// The logger, if it has been built.
    pub fn get_if_initialized(&self) -> Option<&Logger> {
        self.cell.get()
    }
}

static GLOBAL: LazyLogger = LazyLogger::new(Logger::from_env);

/// Change the global logger's minimum level.
pub fn set_level(level: Level) {
    Logger::global().set_level(level);
}

pub fn info(message: impl fmt::Display) {
    Logger::global().info(message);
}

pub fn debug(message: impl fmt::Display) {
    Logger::global().debug(message);
}

pub fn warn(message: impl fmt::Display) {
    Logger::global().warn(message);
}

pub fn error(message: impl fmt::Display) {
    Logger::global().error(message);
}

pub fn info_with_context<Req, Resp>(
    ctx: &Context,
    request: &Req,
    response: &Resp,
    message: impl fmt::Display,
) where
    Req: Serialize + ?Sized,
    Resp: Serialize + ?Sized,
{
    Logger::global().info_with_context(ctx, request, response, message);
}

pub fn debug_with_context<Req, Resp>(
    ctx: &Context,
    request: &Req,
    response: &Resp,
    message: impl fmt::Display,
) where
    Req: Serialize + ?Sized,
    Resp: Serialize + ?Sized,
{
    Logger::global().debug_with_context(ctx, request, response, message);
}

pub fn warn_with_context<Req, Resp>(
    ctx: &Context,
    request: &Req,
    response: &Resp,
    message: impl fmt::Display,
) where
    Req: Serialize + ?Sized,
    Resp: Serialize + ?Sized,
{
    Logger::global().warn_with_context(ctx, request, response, message);
}

pub fn error_with_context<Req, Resp>(
    ctx: &Context,
    request: &Req,
    response: &Resp,
    message: impl fmt::Display,
) where
    Req: Serialize + ?Sized,
    Resp: Serialize + ?Sized,
{
    Logger::global().error_with_context(ctx, request, response, message);
}
