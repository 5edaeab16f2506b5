use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::format::Render;
use crate::record::{field_value, CallSite, ExceptionInfo, Fields, Level, LogRecord};
use crate::sink::LogSink;

/// A renderer paired with the sink its output is written to.
pub struct Handler {
    renderer: Arc<dyn Render>,
    sink: Arc<dyn LogSink>,
    level: Level,
}

impl Handler {
    pub fn new(renderer: impl Render + 'static, sink: Arc<dyn LogSink>) -> Self {
        Handler {
            renderer: Arc::new(renderer),
            sink,
            level: Level::Debug,
        }
    }

    /// Only records at `level` or above reach this handler.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("level", &self.level).finish_non_exhaustive()
    }
}

/// Named logger with a level threshold and a list of handlers.
///
/// Records are built, rendered and written synchronously on the calling
/// thread. Sink failures are reported on stderr and never reach the caller.
#[derive(Debug)]
pub struct Logger {
    name: String,
    level: Level,
    handlers: Vec<Handler>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Logger {
            name: name.into(),
            level: Level::Info,
            handlers: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_handler(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Render `record` for every handler whose threshold admits it and
    /// write the result to that handler's sink.
    pub fn dispatch(&self, record: &LogRecord) {
        if !self.enabled(record.level) {
            return;
        }
        for handler in self.handlers.iter().filter(|h| record.level >= h.level) {
            let line = handler.renderer.render(record);
            if let Err(e) = handler.sink.write(record.level, &line) {
                eprintln!("log sink write failed for logger {:?}: {}", self.name, e);
            }
        }
    }

    /// Flush every handler's sink.
    pub fn flush(&self) {
        for handler in &self.handlers {
            if let Err(e) = handler.sink.flush() {
                eprintln!("log sink flush failed for logger {:?}: {}", self.name, e);
            }
        }
    }

    /// Start building an event at `level`. The call site is captured here.
    #[track_caller]
    pub fn event(&self, level: Level) -> EventBuilder<'_> {
        EventBuilder {
            logger: self,
            level,
            extra: Fields::new(),
            exception: None,
            call_site: CallSite::caller(),
        }
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.event(level).emit(message)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.event(Level::Debug).emit(message)
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.event(Level::Info).emit(message)
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.event(Level::Warning).emit(message)
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.event(Level::Error).emit(message)
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.event(Level::Critical).emit(message)
    }

    /// Log at ERROR with `err` attached as the exception.
    #[track_caller]
    pub fn exception<E>(&self, message: impl Into<String>, err: &E)
    where
        E: Error + 'static,
    {
        self.event(Level::Error).error(err).emit(message)
    }
}

/// Builder for a single event; see [`Logger::event`].
#[must_use = "an event is only logged once `emit` is called"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    level: Level,
    extra: Fields,
    exception: Option<ExceptionInfo>,
    call_site: CallSite,
}

impl<'a> EventBuilder<'a> {
    pub fn field<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + fmt::Debug,
    {
        self.extra.insert(key.into(), field_value(&value));
        self
    }

    /// Attach a value by its `Display` form.
    pub fn display_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.extra
            .insert(key.into(), serde_json::Value::String(value.to_string()));
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.extra.extend(fields);
        self
    }

    pub fn error<E>(mut self, err: &E) -> Self
    where
        E: Error + 'static,
    {
        self.exception = Some(ExceptionInfo::from_error(err));
        self
    }

    pub fn exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.call_site.function = Some(name.into());
        self
    }

    pub fn emit(self, message: impl Into<String>) {
        if !self.logger.enabled(self.level) {
            return;
        }
        let mut record = LogRecord::new(self.level, self.logger.name(), message)
            .with_call_site(self.call_site)
            .with_extra(self.extra);
        if let Some(exception) = self.exception {
            record = record.with_exception(exception);
        }
        self.logger.dispatch(&record);
    }
}
