//! Renderers turning a [`LogRecord`] into one line of output.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::record::LogRecord;

pub mod json;
pub mod text;

pub use json::JsonRenderer;
pub use text::TextRenderer;

/// Pure conversion of a record into its wire form.
///
/// Implementations hold no mutable state and may be shared freely across
/// threads.
pub trait Render: Send + Sync {
    fn render(&self, record: &LogRecord) -> String;
}

/// Built-in output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text { colors: bool },
    Json,
}

impl Render for Format {
    fn render(&self, record: &LogRecord) -> String {
        match *self {
            Format::Text { colors } => TextRenderer::new(colors).render(record),
            Format::Json => JsonRenderer::default().render(record),
        }
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "color" | "colored" => Ok(Format::Text { colors: true }),
            "plain" => Ok(Format::Text { colors: false }),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}
