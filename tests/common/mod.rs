//! Test utilities for apmlog integration tests.
//!
//! Provides:
//! - In-memory writer capturing emitted records
//! - Logger fixtures writing to that capture
//! - JSON line parsing helpers

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use apmlog::{Config, Logger};
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

/// Writer that keeps everything written to it in memory.
#[derive(Clone, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        let buffer = self.buffer.lock().expect("capture lock poisoned");
        String::from_utf8_lossy(&buffer).to_string()
    }

    /// Parse the output as one JSON object per line.
    pub fn records(&self) -> Vec<Value> {
        self.output()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("record is not valid JSON"))
            .collect()
    }

    /// The single record written so far.
    pub fn only_record(&self) -> Value {
        let mut records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one record: {records:?}");
        records.remove(0)
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| io::Error::other("capture lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Configuration used by most tests.
pub fn test_config() -> Config {
    Config {
        service_name: "orders".into(),
        log_level: "debug".into(),
        ..Config::default()
    }
}

/// Logger with stack attribution writing into a fresh capture.
pub fn capture_logger(config: Config) -> (Logger, CaptureWriter) {
    let capture = CaptureWriter::new();
    let logger = Logger::builder(config).writer(capture.clone()).build();
    (logger, capture)
}
