//! Structured operator events.
//!
//! Pipeline code never writes to the console. It emits [`LogEvent`]s through
//! a [`Reporter`], and whoever owns the sink decides how they look. The CLI
//! renders them in color; tests collect them with [`RecordingSink`].

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of an operator event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    /// Progress information.
    Info,
    /// A step completed.
    Success,
    /// Something went wrong but the pipeline continues.
    Warning,
    /// A step failed.
    Error,
    /// An action that would have happened outside dry-run mode.
    DryRun,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Level::Info => "INFO",
            Level::Success => "OK",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
            Level::DryRun => "DRY-RUN",
        };
        f.write_str(tag)
    }
}

/// One operator-facing message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogEvent {
    /// Severity.
    pub level: Level,
    /// Human readable text, possibly multi-line.
    pub message: String,
}

/// Destination for [`LogEvent`]s.
pub trait EventSink: Send + Sync {
    /// Receives one event. Must not block for long.
    fn emit(&self, event: LogEvent);
}

/// Cheap, cloneable handle used by every pipeline component to emit events.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

impl Reporter {
    /// Wraps a sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Emits an event at `level`.
    pub fn emit(&self, level: Level, message: impl Into<String>) {
        self.sink.emit(LogEvent {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(Level::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message);
    }

    /// Emits a `DryRun - <message>` notice.
    pub fn dry_run(&self, message: impl fmt::Display) {
        self.emit(Level::DryRun, format!("DryRun - {message}"));
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<LogEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events at `level`.
    pub fn at_level(&self, level: Level) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LogEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_prefix() {
        let sink = Arc::new(RecordingSink::new());
        let reporter = Reporter::new(sink.clone());

        reporter.dry_run("Created directory /tmp/x.");
        reporter.warn("careful");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::DryRun);
        assert_eq!(events[0].message, "DryRun - Created directory /tmp/x.");
        assert_eq!(sink.at_level(Level::Warning).len(), 1);
    }
}
