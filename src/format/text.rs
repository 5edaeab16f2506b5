use std::fmt::Write as _;

use super::Render;
use crate::record::{Level, LogRecord};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GRAY: &str = "\x1b[90m";
pub const BLUE: &str = "\x1b[34m";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ANSI color used for a level's label and traceback.
pub fn level_color(level: Level) -> &'static str {
    match level {
        Level::Debug => "\x1b[36m",
        Level::Info => "\x1b[32m",
        Level::Warning => "\x1b[33m",
        Level::Error => "\x1b[31m",
        Level::Critical => "\x1b[35m",
        Level::Unknown => RESET,
    }
}

/// Human-readable `timestamp | LEVEL | logger | message` lines.
///
/// With colors enabled every segment is wrapped in its own escape sequence
/// and reset before the separator that follows it.
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    colors: bool,
}

impl TextRenderer {
    pub fn new(colors: bool) -> Self {
        TextRenderer { colors }
    }

    pub fn colored() -> Self {
        Self::new(true)
    }

    pub fn plain() -> Self {
        Self::new(false)
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::colored()
    }
}

impl Render for TextRenderer {
    fn render(&self, record: &LogRecord) -> String {
        let timestamp = record.timestamp.format(TIMESTAMP_FORMAT);
        let level = record.level.as_str();
        let mut out = String::with_capacity(64 + record.message.len());

        // Writing into a String cannot fail.
        if self.colors {
            let color = level_color(record.level);
            let _ = write!(
                out,
                "{GRAY}{timestamp}{RESET} | {color}{BOLD}{level:<8}{RESET} | {BLUE}{logger}{RESET} | {message}",
                logger = record.logger_name,
                message = record.message,
            );
        } else {
            let _ = write!(
                out,
                "{timestamp} | {level:<8} | {logger} | {message}",
                logger = record.logger_name,
                message = record.message,
            );
        }

        if let Some(exception) = &record.exception {
            let trace = exception.traceback_lines().collect::<Vec<_>>().join("\n");
            out.push('\n');
            if self.colors {
                out.push_str(level_color(record.level));
                out.push_str(&trace);
                out.push_str(RESET);
            } else {
                out.push_str(&trace);
            }
        }

        out
    }
}
