//! Timing wrappers.
//!
//! Each wrapper emits exactly one record per invocation: INFO with
//! `status: "success"` when the work completes, ERROR with
//! `status: "error"` when it fails, panics or is cancelled. Both carry
//! `duration_seconds`. The work's own result or error is returned
//! unchanged.

use std::error::Error;
use std::future::Future;
use std::time::Instant;

use serde_json::json;

use crate::logger::Logger;
use crate::record::{CallSite, ExceptionInfo, Fields, Level, LogRecord};

/// Emits the record for one timed invocation. If it is dropped before
/// `success`/`failure` was called, the work panicked or was cancelled.
struct TimingGuard<'a> {
    logger: &'a Logger,
    name: &'a str,
    call_site: CallSite,
    start: Instant,
    done: bool,
}

impl<'a> TimingGuard<'a> {
    fn start(logger: &'a Logger, name: &'a str, call_site: CallSite) -> Self {
        TimingGuard {
            logger,
            name,
            call_site: call_site.with_function(name),
            start: Instant::now(),
            done: false,
        }
    }

    fn success(mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.emit(
            Level::Info,
            format!("{} executed in {:.3}s", self.name, elapsed),
            elapsed,
            "success",
            None,
        );
    }

    fn failure<E>(mut self, err: &E)
    where
        E: Error + 'static,
    {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.emit(
            Level::Error,
            format!("{} failed after {:.3}s: {}", self.name, elapsed, err),
            elapsed,
            "error",
            Some(ExceptionInfo::from_error(err)),
        );
    }

    fn emit(
        &mut self,
        level: Level,
        message: String,
        elapsed: f64,
        status: &str,
        exception: Option<ExceptionInfo>,
    ) {
        self.done = true;
        let mut extra = Fields::new();
        extra.insert("duration_seconds".to_string(), json!(elapsed));
        extra.insert("status".to_string(), json!(status));

        let mut record = LogRecord::new(level, self.logger.name(), message)
            .with_call_site(self.call_site.clone())
            .with_extra(extra);
        if let Some(exception) = exception {
            record = record.with_exception(exception);
        }
        self.logger.dispatch(&record);
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        let reason = if std::thread::panicking() { "panicked" } else { "cancelled" };
        let exception = ExceptionInfo::new(None, Some(format!("{} {}", self.name, reason)));
        let message = format!("{} {} after {:.3}s", self.name, reason, elapsed);
        self.emit(Level::Error, message, elapsed, "error", Some(exception));
    }
}

/// Run fallible `work`, logging its duration and outcome on `logger`.
///
/// ```
/// use tracing_log_context::{logger::Logger, timing::timed};
///
/// let logger = Logger::new("jobs");
/// let parsed: Result<u32, _> = timed(&logger, "parse_port", || "8080".parse::<u32>());
/// assert_eq!(parsed, Ok(8080));
/// ```
#[track_caller]
pub fn timed<T, E, F>(logger: &Logger, name: &str, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Error + 'static,
{
    let guard = TimingGuard::start(logger, name, CallSite::caller());
    match work() {
        Ok(value) => {
            guard.success();
            Ok(value)
        }
        Err(err) => {
            guard.failure(&err);
            Err(err)
        }
    }
}

/// Run infallible `work`, logging its duration on `logger`.
#[track_caller]
pub fn measure<T, F>(logger: &Logger, name: &str, work: F) -> T
where
    F: FnOnce() -> T,
{
    let guard = TimingGuard::start(logger, name, CallSite::caller());
    let value = work();
    guard.success();
    value
}

/// Async counterpart of [`timed`]. Timing starts when this function is
/// called; dropping the returned future early logs a cancellation.
#[track_caller]
pub fn timed_future<'a, T, E, F>(
    logger: &'a Logger,
    name: &'a str,
    future: F,
) -> impl Future<Output = Result<T, E>> + 'a
where
    F: Future<Output = Result<T, E>> + 'a,
    T: 'a,
    E: Error + 'static,
{
    let guard = TimingGuard::start(logger, name, CallSite::caller());
    async move {
        match future.await {
            Ok(value) => {
                guard.success();
                Ok(value)
            }
            Err(err) => {
                guard.failure(&err);
                Err(err)
            }
        }
    }
}
