use std::sync::{Mutex, PoisonError};

use crate::error::SinkError;
use crate::record::Level;
use crate::sink::LogSink;

/// Keeps every rendered line in memory. Intended for tests and demos.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines in write order.
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, line)| line).collect()
    }

    /// `(level, line)` pairs in write order.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, line: &str) -> Result<(), SinkError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
        Ok(())
    }
}
