//! The structured record rendered for each event.

use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};

use crate::frame::CallerFrame;
use crate::level::Level;

/// Keys owned by the formatter. User fields with these names are renamed
/// `fields.<name>`.
pub const RESERVED_KEYS: [&str; 5] = ["level", "msg", "time", "func", "file"];

/// Fields whose string value is JSON text to embed as nested JSON.
pub const JSON_FIELDS: [&str; 2] = ["request", "response"];

const MESSAGE_FIELD: &str = "message";

/// One log line before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub time: Option<String>,
    pub caller: Option<CallerFrame>,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Render the record as a JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();

        for (key, value) in &self.fields {
            let key = if RESERVED_KEYS.contains(&key.as_str()) {
                format!("fields.{key}")
            } else {
                key.clone()
            };
            object.insert(key, value.clone());
        }

        object.insert("level".into(), Value::from(self.level.as_str()));
        object.insert("msg".into(), Value::from(self.message.as_str()));
        if let Some(time) = &self.time {
            object.insert("time".into(), Value::from(time.as_str()));
        }
        if let Some(caller) = &self.caller {
            object.insert("func".into(), Value::from(caller.function_name()));
            if let Some(location) = caller.location() {
                object.insert("file".into(), Value::from(location));
            }
        }

        Value::Object(object)
    }
}

/// Collects an event's fields into JSON values.
#[derive(Debug, Default)]
pub struct FieldCollector {
    pub message: Option<String>,
    pub fields: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_string());
        } else if JSON_FIELDS.contains(&field.name()) {
            let json = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
            self.insert(field, json);
        } else {
            self.insert(field, Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == MESSAGE_FIELD {
            self.message = Some(rendered);
        } else {
            self.insert(field, Value::String(rendered));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // Non-finite floats have no JSON representation and become null.
        self.insert(field, Value::from(value));
    }
}
