use crate::logger::Logger;
use crate::record::{CallSite, ExceptionInfo, Fields, Level, LogRecord};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands them to a [`Logger`].
///
/// The event target becomes the logger name, event fields become extra
/// fields and an error recorded on the event becomes the exception. Active
/// context scopes are snapshotted exactly as for direct logger calls.
pub struct ContextLayer {
    logger: Arc<Logger>,
}

impl ContextLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        ContextLayer { logger }
    }
}

impl<S> Layer<S> for ContextLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        let mut exception: Option<ExceptionInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            exception: &mut exception,
        };
        event.record(&mut visitor);

        let module = meta
            .file()
            .and_then(|file| Path::new(file).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .or_else(|| {
                meta.module_path()
                    .map(|path| path.rsplit("::").next().unwrap_or(path).to_string())
            });
        let call_site = CallSite {
            module,
            function: None,
            line: meta.line(),
        };

        let mut record = LogRecord::new(level, meta.target(), message.unwrap_or_default())
            .with_call_site(call_site)
            .with_extra(fields);
        if let Some(exception) = exception {
            record = record.with_exception(exception);
        }

        self.logger.dispatch(&record);
    }
}

use tracing::field::{Field, Visit};

/// Collects event fields. Values that only implement `Debug` are stored as
/// their debug string.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.fields.insert(field.name().to_string(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn Error + 'static)) {
        *self.exception = Some(ExceptionInfo::from_dyn_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
