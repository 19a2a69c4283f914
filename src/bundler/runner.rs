//! External command execution.
//!
//! Every external tool the pipeline touches (build tool, `codesign`,
//! `hdiutil`, `xcrun`, ...) goes through the [`CommandRunner`] trait. The
//! system implementation spawns real processes; [`DryRunRunner`] only
//! reports; tests substitute scripted runners.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{Error, Reporter, Result};

/// Exit code reported when a program cannot be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// How long to wait for a killed child to be reaped after cancellation.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// A program plus its arguments.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,
    /// Working directory, inherited when `None`.
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let arg = path.as_ref().to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Whether the invocation runs `program` with `subcommand` as its first argument.
    pub fn is(&self, program: &str, subcommand: Option<&str>) -> bool {
        self.program == program
            && subcommand.is_none_or(|sub| self.args.first().map(String::as_str) == Some(sub))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of one external command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutcome {
    /// Process exit code; `-1` when terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output, one `\n` per line.
    pub stdout: String,
    /// Captured standard error, one `\n` per line.
    pub stderr: String,
}

impl CommandOutcome {
    /// A successful outcome with no output.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A failed outcome with `stderr` as the error stream.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Error text for operator messages: stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Narrow seam between the pipeline and the outside world.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion.
    ///
    /// Returns once the process has exited and both output streams reached
    /// end-of-stream. Returns [`Error::Cancelled`] as soon as `cancel` fires.
    /// A non-zero exit is an `Ok` outcome; interpreting it is the caller's job.
    async fn run(&self, invocation: &Invocation, cancel: &CancellationToken)
    -> Result<CommandOutcome>;
}

/// Runs real processes with `tokio::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        log::debug!("Executing: {}", invocation);

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                log::debug!("Failed to start {}: {}", invocation.program, e);
                return Ok(CommandOutcome::failed(
                    SPAWN_FAILURE_EXIT_CODE,
                    format!("failed to start {}: {}", invocation.program, e),
                ));
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Process exit and both end-of-stream signals are awaited jointly.
        let finished = {
            let completion = async {
                tokio::join!(read_lines(stdout), read_lines(stderr), child.wait())
            };
            tokio::select! {
                result = completion => Some(result),
                _ = cancel.cancelled() => None,
            }
        };

        let Some((stdout, stderr, status)) = finished else {
            log::debug!("Cancelled, terminating {}", invocation.program);
            if let Err(e) = child.start_kill() {
                log::debug!("Failed to kill {}: {}", invocation.program, e);
            }
            let _ = tokio::time::timeout(KILL_REAP_TIMEOUT, child.wait()).await;
            return Err(Error::Cancelled);
        };

        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                return Err(Error::GenericError(format!(
                    "waiting for {} failed: {}",
                    invocation.program, e
                )));
            }
        };

        log::debug!("{} exited with {}", invocation.program, exit_code);
        if !stdout.is_empty() {
            log::trace!("{} stdout:\n{}", invocation.program, stdout);
        }

        Ok(CommandOutcome {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Drains a piped stream line by line until end-of-stream.
///
/// Lines are decoded lossily so that a stray non-UTF-8 byte never stops the
/// drain; the pipe stays open until the child closes it.
async fn read_lines<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut captured = String::new();
    let Some(stream) = stream else {
        return captured;
    };

    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let decoded = String::from_utf8_lossy(&line);
                let text = decoded.trim_end_matches('\n').trim_end_matches('\r');
                captured.push_str(text);
                captured.push('\n');
            }
            Err(e) => {
                log::debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
    captured
}

/// Reports every invocation as a dry-run notice and pretends it succeeded.
#[derive(Clone, Debug)]
pub struct DryRunRunner {
    reporter: Reporter,
}

impl DryRunRunner {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.reporter.dry_run(format_args!("executing: {invocation}"));
        Ok(CommandOutcome::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Level, RecordingSink};
    use std::sync::Arc;

    #[test]
    fn test_invocation_display_quotes_spaces() {
        let invocation = Invocation::new("codesign")
            .args(["--sign", "Developer ID Application: Me"])
            .path_arg("/tmp/My App.app");
        assert_eq!(
            invocation.to_string(),
            "codesign --sign \"Developer ID Application: Me\" \"/tmp/My App.app\""
        );
        assert!(invocation.is("codesign", Some("--sign")));
        assert!(!invocation.is("codesign", Some("--verify")));
    }

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let outcome = CommandOutcome {
            exit_code: 1,
            stdout: "build output\n".into(),
            stderr: "\n".into(),
        };
        assert_eq!(outcome.diagnostics(), "build output");
        assert_eq!(CommandOutcome::failed(2, "boom\n").diagnostics(), "boom");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams() {
        let cancel = CancellationToken::new();
        let outcome = SystemRunner
            .run(
                &Invocation::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]),
                &cancel,
            )
            .await
            .expect("run");

        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_flushed_at_exit_is_delivered() {
        let cancel = CancellationToken::new();
        let outcome = SystemRunner
            .run(
                &Invocation::new("sh").args(["-c", "for i in 1 2 3 4 5; do echo line$i; done"]),
                &cancel,
            )
            .await
            .expect("run");

        assert!(outcome.success());
        assert_eq!(outcome.stdout.lines().count(), 5);
        assert!(outcome.stdout.ends_with("line5\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_does_not_stop_the_drain() {
        let cancel = CancellationToken::new();
        let outcome = SystemRunner
            .run(
                &Invocation::new("sh").args([
                    "-c",
                    "printf 'bad \\377\\n'; echo after; echo err 1>&2",
                ]),
                &cancel,
            )
            .await
            .expect("run");

        assert!(outcome.success());
        assert_eq!(outcome.stdout, "bad \u{FFFD}\nafter\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_output_after_invalid_byte_is_kept() {
        let cancel = CancellationToken::new();
        let outcome = SystemRunner
            .run(
                &Invocation::new("sh").args([
                    "-c",
                    "printf 'bad \\377\\n'; i=0; while [ $i -lt 10000 ]; do echo 0123456789012345678901234567890; i=$((i+1)); done",
                ]),
                &cancel,
            )
            .await
            .expect("run");

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.lines().count(), 10_001);
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_exit_code() {
        let cancel = CancellationToken::new();
        let outcome = SystemRunner
            .run(&Invocation::new("definitely-not-a-real-tool-7f3a"), &cancel)
            .await
            .expect("run");

        assert_eq!(outcome.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(outcome.stderr.contains("definitely-not-a-real-tool-7f3a"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_returns_promptly() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = SystemRunner
            .run(&Invocation::new("sleep").arg("30"), &cancel)
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_dry_run_runner_reports_without_running() {
        let sink = Arc::new(RecordingSink::new());
        let runner = DryRunRunner::new(Reporter::new(sink.clone()));
        let cancel = CancellationToken::new();

        let outcome = runner
            .run(&Invocation::new("hdiutil").arg("create"), &cancel)
            .await
            .expect("run");

        assert!(outcome.success());
        let events = sink.at_level(Level::DryRun);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "DryRun - executing: hdiutil create");
    }
}
