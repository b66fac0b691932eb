//! JSON event formatting with caller attribution.
//!
//! [`CallerJsonFormat`] plugs into `tracing_subscriber::fmt` as the event
//! formatter. For every event it asks its [`AttributionStrategy`] for the
//! application frame and writes one JSON object (or an indented block when
//! pretty printing).

mod record;

use std::fmt;
use std::sync::Arc;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

pub use record::{FieldCollector, LogRecord, JSON_FIELDS, RESERVED_KEYS};

use crate::frame::AttributionStrategy;
use crate::level::Level;

/// JSON formatter that attributes each record to the calling application frame.
#[derive(Clone)]
pub struct CallerJsonFormat {
    attribution: Arc<dyn AttributionStrategy>,
    pretty: bool,
    timestamp: bool,
}

impl CallerJsonFormat {
    /// Compact, timestamped output using the given strategy.
    pub fn new(attribution: Arc<dyn AttributionStrategy>) -> Self {
        Self {
            attribution,
            pretty: false,
            timestamp: true,
        }
    }

    /// Emit indented multi-line JSON.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Include the `time` key.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the record for an event, resolving its caller.
    pub fn record(&self, event: &Event<'_>) -> LogRecord {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        LogRecord {
            level: Level::from(event.metadata().level()),
            message: collector.message.unwrap_or_default(),
            time: self.timestamp.then(now).flatten(),
            caller: self.attribution.resolve(),
            fields: collector.fields,
        }
    }
}

impl fmt::Debug for CallerJsonFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerJsonFormat")
            .field("pretty", &self.pretty)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl<S, N> FormatEvent<S, N> for CallerJsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let json = self.record(event).to_json();
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        }
        .map_err(|_| fmt::Error)?;

        writeln!(writer, "{rendered}")
    }
}

/// Current time in RFC 3339.
fn now() -> Option<String> {
    let mut buffer = String::new();
    SystemTime.format_time(&mut Writer::new(&mut buffer)).ok()?;
    Some(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CallerFrame, NoAttribution};
    use serde_json::Value;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn output(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    struct FixedCaller;

    impl AttributionStrategy for FixedCaller {
        fn resolve(&self) -> Option<CallerFrame> {
            Some(CallerFrame {
                function: "orders::checkout::submit".into(),
                file: Some("src/checkout.rs".into()),
                line: Some(88),
            })
        }
    }

    fn capture_with(format: CallerJsonFormat, emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(capture.clone()),
        );
        tracing::subscriber::with_default(subscriber, emit);
        capture.output()
    }

    #[test]
    fn test_compact_line_with_caller() {
        let format = CallerJsonFormat::new(Arc::new(FixedCaller));
        let output = capture_with(format, || {
            tracing::error!(trace_id = "t-1", "payment declined");
        });

        assert_eq!(output.lines().count(), 1);
        let json: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["msg"], "payment declined");
        assert_eq!(json["func"], "submit");
        assert_eq!(json["file"], "src/checkout.rs:88");
        assert_eq!(json["trace_id"], "t-1");
        assert!(json["time"].is_string());
    }

    #[test]
    fn test_pretty_output_spans_lines() {
        let format = CallerJsonFormat::new(Arc::new(NoAttribution))
            .pretty(true)
            .with_timestamp(false);
        let output = capture_with(format, || tracing::info!("ready"));

        assert!(output.lines().count() > 1);
        assert!(output.contains("\n  \"level\": \"info\""));
        let json: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["msg"], "ready");
    }

    #[test]
    fn test_missing_caller_omits_func_and_file() {
        let format = CallerJsonFormat::new(Arc::new(NoAttribution)).with_timestamp(false);
        let output = capture_with(format, || tracing::warn!("no frame"));

        let json: Value = serde_json::from_str(output.trim()).unwrap();
        assert!(json.get("func").is_none());
        assert!(json.get("file").is_none());
        assert!(json.get("time").is_none());
        assert_eq!(json["level"], "warning");
    }

    #[test]
    fn test_request_fields_embed_json() {
        let format = CallerJsonFormat::new(Arc::new(NoAttribution));
        let output = capture_with(format, || {
            tracing::info!(request = r#"{"Name":"x"}"#, response = "null", count = 3_u64, "ok");
        });

        let json: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(json["request"]["Name"], "x");
        assert!(json["response"].is_null());
        assert_eq!(json["count"], 3);
    }
}
