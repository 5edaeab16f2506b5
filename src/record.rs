use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::str::FromStr;

use crate::context;
use crate::error::ConfigError;

/// Key/value fields attached to a record.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Names of record attributes that call-site extra fields may not shadow.
///
/// Extra keys found in this list are dropped when the record is built.
pub const RESERVED_KEYS: &[&str] = &[
    "args",
    "created",
    "exc_info",
    "exc_text",
    "exception",
    "extra",
    "filename",
    "funcName",
    "function",
    "level",
    "levelname",
    "levelno",
    "line",
    "lineno",
    "logger",
    "message",
    "module",
    "msecs",
    "msg",
    "name",
    "pathname",
    "process",
    "processName",
    "relativeCreated",
    "stack_info",
    "taskName",
    "thread",
    "threadName",
    "timestamp",
];

/// Returns `true` if `key` names a reserved record attribute.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Convert any serializable value into a field value.
///
/// Values that fail to serialize (maps with non-string keys, types whose
/// `Serialize` impl errors) are stored as their `Debug` representation.
pub fn field_value<T>(value: &T) -> serde_json::Value
where
    T: Serialize + fmt::Debug + ?Sized,
{
    serde_json::to_value(value).unwrap_or_else(|_| serde_json::Value::String(format!("{:?}", value)))
}

/// Severity of a record.
///
/// `Unknown` is the sentinel for level values that could not be mapped; it
/// sorts above `Critical` so no threshold ever filters it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Unknown,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Unknown => "UNKNOWN",
        }
    }

    /// Lenient lookup by name (case-insensitive). Unrecognized names map to
    /// [`Level::Unknown`].
    pub fn from_name(name: &str) -> Level {
        match name.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Level::Debug,
            "INFO" => Level::Info,
            "WARNING" | "WARN" => Level::Warning,
            "ERROR" => Level::Error,
            "CRITICAL" | "FATAL" => Level::Critical,
            _ => Level::Unknown,
        }
    }

    /// Lookup by the conventional numeric severity (10, 20, 30, 40, 50).
    pub fn from_number(value: u32) -> Level {
        match value {
            10 => Level::Debug,
            20 => Level::Info,
            30 => Level::Warning,
            40 => Level::Error,
            50 => Level::Critical,
            _ => Level::Unknown,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Level::from_name(s) {
            Level::Unknown => Err(ConfigError::UnknownLevel(s.to_string())),
            level => Ok(level),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            _ => Level::Error,
        }
    }
}

/// Where a record was emitted from. Every piece is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub module: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
}

impl CallSite {
    /// Call site of the caller, as seen through `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// The module is the source file name without its extension.
    pub fn from_location(location: &Location<'_>) -> Self {
        let module = Path::new(location.file())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        CallSite {
            module,
            function: None,
            line: Some(location.line()),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

/// Error details attached to a record emitted from an error path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub type_name: Option<String>,
    pub message: Option<String>,
    /// One entry per formatted line, outermost error first.
    pub traceback: Vec<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: Option<String>, message: Option<String>) -> Self {
        let mut info = ExceptionInfo {
            type_name,
            message,
            traceback: Vec::new(),
        };
        info.traceback.push(info.headline());
        info
    }

    /// Capture an error whose concrete type is known at the call site.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: Error + 'static,
    {
        Self::capture(Some(short_type_name::<E>()), err)
    }

    /// Capture a type-erased error. The type name is unavailable.
    pub fn from_dyn_error(err: &(dyn Error + 'static)) -> Self {
        Self::capture(None, err)
    }

    fn capture(type_name: Option<String>, err: &(dyn Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new(type_name, Some(err.to_string()));
        let mut source = err.source();
        while let Some(cause) = source {
            info.traceback.push(format!("Caused by: {}", cause));
            source = cause.source();
        }
        info
    }

    fn headline(&self) -> String {
        match (&self.type_name, &self.message) {
            (Some(t), Some(m)) => format!("{}: {}", t, m),
            (Some(t), None) => t.clone(),
            (None, Some(m)) => m.clone(),
            (None, None) => "<unknown error>".to_string(),
        }
    }

    /// Traceback split so that no entry contains a line break.
    pub fn traceback_lines(&self) -> impl Iterator<Item = &str> {
        self.traceback.iter().flat_map(|entry| entry.lines())
    }
}

/// Last path segment of a type name, generics stripped.
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// One log event.
///
/// Built once at the log call and not modified after it is handed to a
/// renderer.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub logger_name: String,
    pub message: String,
    pub call_site: Option<CallSite>,
    pub exception: Option<ExceptionInfo>,
    pub extra_fields: Fields,
    /// Snapshot of the active context scopes taken when the record was
    /// created.
    pub context_fields: Fields,
}

impl LogRecord {
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Local::now(),
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            call_site: None,
            exception: None,
            extra_fields: Fields::new(),
            context_fields: context::current_fields(),
        }
    }

    /// Add call-site fields. Reserved keys are silently dropped.
    pub fn with_extra(mut self, extra: Fields) -> Self {
        for (key, value) in extra {
            if !is_reserved(&key) {
                self.extra_fields.insert(key, value);
            }
        }
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        if !is_reserved(&key) {
            self.extra_fields.insert(key, value);
        }
        self
    }

    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn module(&self) -> Option<&str> {
        self.call_site.as_ref().and_then(|c| c.module.as_deref())
    }

    pub fn function(&self) -> Option<&str> {
        self.call_site.as_ref().and_then(|c| c.function.as_deref())
    }

    pub fn line(&self) -> Option<u32> {
        self.call_site.as_ref().and_then(|c| c.line)
    }

    /// Context fields overlaid with extra fields; call-site values win.
    pub fn merged_fields(&self) -> Fields {
        let mut merged = self.context_fields.clone();
        merged.extend(self.extra_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}
