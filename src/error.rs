use std::path::PathBuf;

/// Error returned by a [`LogSink`](crate::sink::LogSink) when a rendered
/// line could not be delivered.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to write log line: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to rotate log file {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned while building loggers from configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),

    #[error("unknown log format: {0:?} (expected \"text\" or \"json\")")]
    UnknownFormat(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("failed to open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}

/// Structural misuse of the context scope API.
///
/// These are programmer errors: the scope manager panics with this value's
/// message instead of returning it.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("context scope {exiting} exited while scope {innermost} is still active")]
    OutOfOrder { exiting: u64, innermost: u64 },

    #[error("context scope {0} is not active in this execution context")]
    NotActive(u64),
}
