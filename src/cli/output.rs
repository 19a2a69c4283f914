//! Colored terminal output.
//!
//! [`OutputManager`] is also the [`EventSink`] the CLI hands to the
//! pipeline, so stage events and the CLI's own messages share one style.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::bundler::{EventSink, Level, LogEvent};

/// Writes leveled, colored messages to stdout and stderr.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    color: ColorChoice,
}

impl OutputManager {
    pub fn new(verbose: bool) -> Self {
        let color = if std::env::var_os("NO_COLOR").is_some() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Self { verbose, color }
    }

    /// Plain informational line on stdout.
    pub fn println(&self, message: &str) -> io::Result<()> {
        self.write_line(false, None, false, message)
    }

    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.println(message)
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        self.write_line(false, Some(Color::Green), false, message)
    }

    pub fn dry_run(&self, message: &str) -> io::Result<()> {
        self.write_line(false, Some(Color::Cyan), false, message)
    }

    /// Warnings and errors go to stderr.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.write_line(true, Some(Color::Yellow), false, message)
    }

    pub fn error(&self, message: &str) -> io::Result<()> {
        self.write_line(true, Some(Color::Red), true, message)
    }

    /// Bold section header preceded by a blank line.
    pub fn section(&self, title: &str) -> io::Result<()> {
        self.write_line(false, None, false, "")?;
        self.write_line(false, None, true, title)
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.println(&format!("  {}", message))
    }

    fn write_line(
        &self,
        to_stderr: bool,
        color: Option<Color>,
        bold: bool,
        message: &str,
    ) -> io::Result<()> {
        let mut stream = if to_stderr {
            StandardStream::stderr(self.color)
        } else {
            StandardStream::stdout(self.color)
        };

        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        stream.set_color(&spec)?;
        write!(stream, "{}", message)?;
        stream.reset()?;
        writeln!(stream)
    }
}

impl EventSink for OutputManager {
    fn emit(&self, event: LogEvent) {
        let written = match event.level {
            Level::Info => self.println(&event.message),
            Level::Success => self.success(&event.message),
            Level::Warning => self.warn(&event.message),
            Level::Error => self.error(&event.message),
            Level::DryRun => self.dry_run(&event.message),
        };
        // A closed terminal must not abort the pipeline.
        if let Err(e) = written {
            log::debug!("failed to write {} event: {}", event.level, e);
        }
    }
}
