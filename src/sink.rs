use crate::error::SinkError;
use crate::record::Level;

/// Destination for rendered log lines.
///
/// Implementations are responsible for delivering a single rendered
/// record (text or JSON) to a concrete target such as the console or a
/// rotating file. Writes happen synchronously on the logging thread.
pub trait LogSink: Send + Sync {
    /// Write one rendered record.
    ///
    /// **Parameters**
    /// - `level`: level of the originating record.
    /// - `line`: rendered record without a trailing newline.
    ///
    /// **Returns**
    /// - `Ok(())` if the line was accepted.
    /// - `Err(..)` if the target failed. The logger reports the failure on
    ///   stderr and carries on; it is never surfaced at the log call.
    fn write(&self, level: Level, line: &str) -> Result<(), SinkError>;

    /// Flush any buffered output. Default implementation is a no-op.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
