//! Leveled logging with colored-text and JSON renderers, scoped context
//! fields and timing helpers.
//!
//! ```
//! use std::sync::Arc;
//! use tracing_log_context::{context, fields};
//! use tracing_log_context::format::JsonRenderer;
//! use tracing_log_context::logger::{Handler, Logger};
//! use tracing_log_context::memory_sink::MemorySink;
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::new("api").with_handler(Handler::new(JsonRenderer::default(), sink.clone()));
//!
//! context::scope(fields! { "request_id" => "abc123" }, || {
//!     logger.info("processing request");
//! });
//!
//! assert!(sink.lines()[0].contains("\"request_id\":\"abc123\""));
//! ```

pub mod context;
pub mod error;
pub mod record;
pub mod format;
pub mod sink;
pub mod logger;
pub mod layer;
pub mod timing;

pub mod console;
pub mod rotating;
pub mod memory_sink;
pub mod noop_sink;

pub mod init;
pub mod env;

pub use context::{LogContextExt, ScopeGuard};
pub use error::{ConfigError, ScopeError, SinkError};
pub use format::{Format, JsonRenderer, Render, TextRenderer};
pub use logger::{Handler, Logger};
pub use record::{CallSite, ExceptionInfo, Fields, Level, LogRecord};
pub use sink::LogSink;
