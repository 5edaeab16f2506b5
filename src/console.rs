use std::io::{self, Write};

use crate::error::SinkError;
use crate::record::Level;
use crate::sink::LogSink;

/// Which standard stream a [`ConsoleSink`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Writes each line to stdout or stderr.
///
/// The stream lock is held for the whole line so concurrent writers never
/// interleave within a record.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        ConsoleSink { target: ConsoleTarget::Stdout }
    }

    pub fn stderr() -> Self {
        ConsoleSink { target: ConsoleTarget::Stderr }
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, _level: Level, line: &str) -> Result<(), SinkError> {
        match self.target {
            ConsoleTarget::Stdout => writeln!(io::stdout().lock(), "{}", line)?,
            ConsoleTarget::Stderr => writeln!(io::stderr().lock(), "{}", line)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush()?,
            ConsoleTarget::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_select_the_stream() {
        assert_eq!(ConsoleSink::stdout().target, ConsoleTarget::Stdout);
        assert_eq!(ConsoleSink::stderr().target, ConsoleTarget::Stderr);
        assert_eq!(ConsoleSink::default().target, ConsoleTarget::Stdout);
    }

    #[test]
    fn both_streams_accept_lines() {
        for sink in [ConsoleSink::stdout(), ConsoleSink::stderr()] {
            sink.write(Level::Error, "console sink smoke line").unwrap();
            sink.flush().unwrap();
        }
    }
}
