use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::SinkError;
use crate::record::Level;
use crate::sink::LogSink;

/// Default size threshold before a log file is rotated (10 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of rotated files kept next to the active one.
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Appends lines to a file and rotates it by size.
///
/// When writing a line would push the file to `max_bytes` or beyond, the
/// active file is renamed to `<path>.1`, `<path>.1` to `<path>.2` and so on
/// up to `backup_count`; the oldest backup is discarded. Rotation is
/// disabled when `max_bytes` or `backup_count` is 0, and the file then
/// grows without bound.
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    state: Mutex<FileState>,
}

struct FileState {
    file: File,
    size: u64,
}

impl RotatingFileSink {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(RotatingFileSink {
            path,
            max_bytes,
            backup_count,
            state: Mutex::new(FileState { file, size }),
        })
    }

    /// Sink with the default 10 MiB threshold and 5 backups.
    pub fn with_defaults(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::new(path, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn should_rotate(&self, state: &FileState, incoming: u64) -> bool {
        self.max_bytes > 0
            && self.backup_count > 0
            && state.size > 0
            && state.size + incoming >= self.max_bytes
    }

    fn rotate(&self, state: &mut FileState) -> Result<(), SinkError> {
        let wrap = |source: io::Error| SinkError::Rotate { path: self.path.clone(), source };

        state.file.flush().map_err(wrap)?;

        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                let to = self.backup_path(index + 1);
                if to.exists() {
                    fs::remove_file(&to).map_err(wrap)?;
                }
                fs::rename(&from, &to).map_err(wrap)?;
            }
        }

        let first = self.backup_path(1);
        if first.exists() {
            fs::remove_file(&first).map_err(wrap)?;
        }
        fs::rename(&self.path, &first).map_err(wrap)?;

        state.file = open_append(&self.path).map_err(wrap)?;
        state.size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl LogSink for RotatingFileSink {
    fn write(&self, _level: Level, line: &str) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let incoming = line.len() as u64 + 1;

        if self.should_rotate(&state, incoming) {
            self.rotate(&mut state)?;
        }

        state.file.write_all(line.as_bytes())?;
        state.file.write_all(b"\n")?;
        state.size += incoming;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn appends_lines_below_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new(&path, 1024, 2).unwrap();

        sink.write(Level::Info, "first").unwrap();
        sink.write(Level::Info, "second").unwrap();

        assert_eq!(read(&path), "first\nsecond\n");
        assert!(!dir.path().join("app.log.1").exists());
    }

    #[test]
    fn rotates_and_caps_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        // Each line is 10 bytes with its newline; two lines fit below 25.
        let sink = RotatingFileSink::new(&path, 25, 2).unwrap();

        for i in 0..8 {
            sink.write(Level::Info, &format!("line-{:04}", i)).unwrap();
        }

        assert_eq!(read(&path), "line-0006\nline-0007\n");
        assert_eq!(read(&dir.path().join("app.log.1")), "line-0004\nline-0005\n");
        assert_eq!(read(&dir.path().join("app.log.2")), "line-0002\nline-0003\n");
        assert!(!dir.path().join("app.log.3").exists());
    }

    #[test]
    fn zero_backups_never_rotates_or_drops_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let sink = RotatingFileSink::new(&path, 15, 0).unwrap();

        sink.write(Level::Info, "aaaaaaaa").unwrap();
        sink.write(Level::Info, "bbbbbbbb").unwrap();
        sink.write(Level::Info, "cccccccc").unwrap();

        assert_eq!(read(&path), "aaaaaaaa\nbbbbbbbb\ncccccccc\n");
        assert!(!dir.path().join("app.log.1").exists());
    }

    #[test]
    fn defaults_are_ten_mebibytes_and_five_backups() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingFileSink::with_defaults(dir.path().join("app.log")).unwrap();

        assert_eq!(sink.max_bytes, 10 * 1024 * 1024);
        assert_eq!(sink.backup_count, 5);
        assert_eq!(sink.path(), dir.path().join("app.log"));
    }

    #[test]
    fn existing_file_size_counts_towards_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "0123456789012345678\n").unwrap();

        let sink = RotatingFileSink::new(&path, 25, 1).unwrap();
        sink.write(Level::Info, "next").unwrap();

        assert_eq!(read(&path), "next\n");
        assert_eq!(read(&dir.path().join("app.log.1")), "0123456789012345678\n");
    }
}
