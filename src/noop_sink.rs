use crate::error::SinkError;
use crate::record::Level;
use crate::sink::LogSink;

/// A sink that simply drops all lines.
///
/// Useful for measuring the cost of building and rendering records without
/// any I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write(&self, _level: Level, _line: &str) -> Result<(), SinkError> {
        Ok(())
    }
}
