use crate::console::ConsoleSink;
use crate::error::ConfigError;
use crate::format::{Format, JsonRenderer};
use crate::layer::ContextLayer;
use crate::logger::{Handler, Logger};
use crate::record::Level;
use crate::rotating::{RotatingFileSink, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Logger configuration.
///
/// **Fields**
/// - `level`: minimum level a record needs to be emitted.
/// - `log_file`: optional path of a size-rotated file. File output is
///   always JSON.
/// - `use_json`: render console output as JSON instead of text.
/// - `use_colors`: color the text console output.
/// - `max_bytes`: file size that triggers rotation.
/// - `backup_count`: number of rotated files kept.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggerConfig {
    pub level: Level,
    pub log_file: Option<PathBuf>,
    pub use_json: bool,
    pub use_colors: bool,
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            log_file: None,
            use_json: false,
            use_colors: true,
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

impl LoggerConfig {
    /// Format used for console output.
    pub fn console_format(&self) -> Format {
        if self.use_json {
            Format::Json
        } else {
            Format::Text { colors: self.use_colors }
        }
    }
}

/// Build a new logger from `config`.
///
/// The console handler writes to stdout; when `log_file` is set a
/// [`RotatingFileSink`] handler rendering JSON is added as well.
pub fn build_logger(name: &str, config: &LoggerConfig) -> Result<Logger, ConfigError> {
    let console = Handler::new(config.console_format(), Arc::new(ConsoleSink::stdout()));
    let mut logger = Logger::new(name).with_level(config.level).with_handler(console);

    if let Some(path) = &config.log_file {
        let sink = RotatingFileSink::new(path, config.max_bytes, config.backup_count).map_err(|source| {
            ConfigError::OpenLogFile {
                path: path.clone(),
                source,
            }
        })?;
        logger.add_handler(Handler::new(JsonRenderer::default(), Arc::new(sink)));
    }

    Ok(logger)
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Logger>>> {
    static LOGGERS: OnceLock<Mutex<HashMap<String, Arc<Logger>>>> = OnceLock::new();
    LOGGERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Return the process-wide logger registered under `name`, creating it
/// from `config` on first use.
///
/// Later calls with the same name return the existing logger and ignore
/// `config`, so handlers are never attached twice.
pub fn get_logger(name: &str, config: &LoggerConfig) -> Result<Arc<Logger>, ConfigError> {
    let mut loggers = registry().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(logger) = loggers.get(name) {
        return Ok(Arc::clone(logger));
    }
    let logger = Arc::new(build_logger(name, config)?);
    loggers.insert(name.to_string(), Arc::clone(&logger));
    Ok(logger)
}

/// Install a [`Registry`] with a [`ContextLayer`] as the global default
/// subscriber, routing every `tracing` event in the process to `logger`.
///
/// Returns [`ConfigError::SubscriberAlreadySet`] if a global subscriber
/// was installed before.
pub fn try_init_tracing(logger: Arc<Logger>) -> Result<(), ConfigError> {
    let subscriber = Registry::default().with(ContextLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber).map_err(|_| ConfigError::SubscriberAlreadySet)
}

/// Like [`try_init_tracing`] but panics if a global subscriber is already
/// installed. Intended to be called once at startup.
pub fn init_tracing(logger: Arc<Logger>) {
    try_init_tracing(logger).expect("set global subscriber");
}
