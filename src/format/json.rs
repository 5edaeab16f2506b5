use serde::Serialize;
use serde_json::json;

use super::Render;
use crate::record::{Fields, LogRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One JSON object per record, always on a single line.
#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer {
    /// Whether merged extra/context fields are emitted under `extra`.
    pub include_extra: bool,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        JsonRenderer { include_extra: true }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    logger: &'a str,
    message: &'a str,
    module: Option<&'a str>,
    function: Option<&'a str>,
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<JsonException<'a>>,
}

#[derive(Serialize)]
struct JsonException<'a> {
    #[serde(rename = "type")]
    type_name: Option<&'a str>,
    message: Option<&'a str>,
    traceback: Vec<&'a str>,
}

impl JsonRenderer {
    fn line<'a>(&self, record: &'a LogRecord) -> JsonLine<'a> {
        let extra = if self.include_extra {
            Some(record.merged_fields()).filter(|f| !f.is_empty())
        } else {
            None
        };

        JsonLine {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            level: record.level.as_str(),
            logger: &record.logger_name,
            message: &record.message,
            module: record.module(),
            function: record.function(),
            line: record.line(),
            extra,
            exception: record.exception.as_ref().map(|e| JsonException {
                type_name: e.type_name.as_deref(),
                message: e.message.as_deref(),
                traceback: e.traceback_lines().collect(),
            }),
        }
    }

    /// Encode `line`, falling back to [`degraded`](Self::degraded) output
    /// for `record` if serialization fails.
    fn encode<T: Serialize>(&self, line: &T, record: &LogRecord) -> String {
        match serde_json::to_string(line) {
            Ok(line) => line,
            Err(err) => {
                eprintln!("json log encoding failed, degrading output: {}", err);
                self.degraded(record)
            }
        }
    }

    /// Base keys only, with the merged fields stringified.
    fn degraded(&self, record: &LogRecord) -> String {
        let mut value = json!({
            "timestamp": record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "level": record.level.as_str(),
            "logger": record.logger_name,
            "message": record.message,
            "module": record.module(),
            "function": record.function(),
            "line": record.line(),
        });
        let fields = record.merged_fields();
        if self.include_extra && !fields.is_empty() {
            value["extra"] = json!(format!("{:?}", fields));
        }
        value.to_string()
    }
}

impl Render for JsonRenderer {
    fn render(&self, record: &LogRecord) -> String {
        self.encode(&self.line(record), record)
    }
}
