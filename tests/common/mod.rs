//! Shared helpers for integration tests: a scripted command runner that
//! fakes the external toolchain, and a copy of the sample project.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kodegen_bundler_universal::bundler::{
    BuildConfiguration, BundleAssembler, CommandOutcome, CommandRunner, Error, Invocation,
    RecordingSink, Reporter, Result, Settings, SettingsBuilder,
};
use tokio_util::sync::CancellationToken;

type Predicate = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

struct Failure {
    matches: Predicate,
    outcome: CommandOutcome,
}

struct Trigger {
    matches: Predicate,
    token: CancellationToken,
}

/// Fakes `dotnet`, `hdiutil`, `ln` and `security`; everything else succeeds
/// silently unless a failure rule matches.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Invocation>>,
    failures: Mutex<Vec<Failure>>,
    triggers: Mutex<Vec<Trigger>>,
    /// Files written by `dotnet publish`, keyed by runtime identifier.
    publish_outputs: BTreeMap<String, Vec<(String, Vec<u8>)>>,
    identities: Vec<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file that `dotnet publish --runtime <rid>` produces.
    pub fn with_publish_file(mut self, rid: &str, name: &str, content: &[u8]) -> Self {
        self.publish_outputs
            .entry(rid.to_string())
            .or_default()
            .push((name.to_string(), content.to_vec()));
        self
    }

    /// Adds an identity listed by `security find-identity`.
    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identities.push(identity.to_string());
        self
    }

    /// Makes matching invocations exit with `exit_code` and `stderr`.
    pub fn fail_when(
        self,
        matches: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
        exit_code: i32,
        stderr: &str,
    ) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(Failure {
                matches: Box::new(matches),
                outcome: CommandOutcome::failed(exit_code, stderr),
            });
        }
        self
    }

    /// Raises `token` when a matching invocation runs, after it completes.
    pub fn cancel_when(
        self,
        matches: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
        token: CancellationToken,
    ) -> Self {
        if let Ok(mut triggers) = self.triggers.lock() {
            triggers.push(Trigger {
                matches: Box::new(matches),
                token,
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, program: &str, subcommand: Option<&str>) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.is(program, subcommand))
            .count()
    }

    fn simulate(&self, invocation: &Invocation) -> std::io::Result<CommandOutcome> {
        if invocation.is("dotnet", Some("publish")) {
            let output = value_after(invocation, "--output").map(PathBuf::from);
            let rid = value_after(invocation, "--runtime").unwrap_or_default();
            if let Some(output) = output {
                std::fs::create_dir_all(&output)?;
                for (name, content) in self.publish_outputs.get(rid).into_iter().flatten() {
                    let path = output.join(name);
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, content)?;
                }
            }
        } else if invocation.is("hdiutil", Some("create")) {
            if let Some(dmg) = invocation.args.last() {
                std::fs::write(dmg, b"fake disk image")?;
            }
        } else if invocation.is("ln", Some("-s")) {
            let target = &invocation.args[1];
            let link = &invocation.args[2];
            std::os::unix::fs::symlink(target, link)?;
        } else if invocation.is("security", Some("find-identity")) {
            let listing = self
                .identities
                .iter()
                .enumerate()
                .map(|(i, id)| format!("  {}) 0123456789ABCDEF \"{}\"\n", i + 1, id))
                .collect::<String>();
            return Ok(CommandOutcome {
                exit_code: 0,
                stdout: format!("{listing}     {} valid identities found\n", self.identities.len()),
                stderr: String::new(),
            });
        }
        Ok(CommandOutcome::ok())
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.calls
            .lock()
            .expect("calls lock")
            .push(invocation.clone());

        let failure = self
            .failures
            .lock()
            .expect("failures lock")
            .iter()
            .find(|failure| (failure.matches)(invocation))
            .map(|failure| failure.outcome.clone());

        let outcome = match failure {
            Some(outcome) => outcome,
            None => self.simulate(invocation)?,
        };

        for trigger in self.triggers.lock().expect("triggers lock").iter() {
            if (trigger.matches)(invocation) {
                trigger.token.cancel();
            }
        }

        Ok(outcome)
    }
}

fn value_after<'a>(invocation: &'a Invocation, flag: &str) -> Option<&'a str> {
    invocation
        .args
        .iter()
        .position(|arg| arg == flag)
        .and_then(|i| invocation.args.get(i + 1))
        .map(String::as_str)
}

/// Copies the sample project into a fresh temporary directory.
pub fn sample_project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/SampleApp");
    copy_tree(&fixture, dir.path());
    let project = dir.path().join("SampleApp.csproj");
    (dir, project)
}

fn copy_tree(from: &Path, to: &Path) {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.expect("walk fixture");
        let dest = to.join(entry.path().strip_prefix(from).expect("prefix"));
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).expect("create fixture dir");
        } else {
            std::fs::copy(entry.path(), &dest).expect("copy fixture file");
        }
    }
}

/// Settings for the sample project with a fixed version.
pub fn settings_for(project: &Path) -> SettingsBuilder {
    SettingsBuilder::new()
        .project_file(project)
        .version("1.2.3.4")
}

pub struct Harness {
    pub settings: Arc<Settings>,
    pub runner: Arc<ScriptedRunner>,
    pub sink: Arc<RecordingSink>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new(settings: Settings, runner: ScriptedRunner) -> Self {
        Self::with_token(settings, runner, CancellationToken::new())
    }

    pub fn with_token(settings: Settings, runner: ScriptedRunner, cancel: CancellationToken) -> Self {
        Self {
            settings: Arc::new(settings),
            runner: Arc::new(runner),
            sink: Arc::new(RecordingSink::new()),
            cancel,
        }
    }

    pub fn assembler(&self) -> BundleAssembler {
        BundleAssembler::new(
            self.settings.clone(),
            self.runner.clone(),
            Reporter::new(self.sink.clone()),
            self.cancel.clone(),
        )
    }

    pub fn macos_dir(&self, configuration: BuildConfiguration) -> PathBuf {
        self.settings
            .bundle_dir(configuration)
            .join("Contents")
            .join("MacOS")
    }
}

pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}
