//! Shared state handed to every pipeline stage.

use tokio_util::sync::CancellationToken;

use super::{
    BuildConfiguration, CommandOutcome, CommandRunner, Error, Invocation, Reporter, Result,
    Settings,
};

/// Everything a stage needs for one configuration: settings, the command
/// seam, the event reporter and the run-wide cancellation token.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub settings: &'a Settings,
    pub runner: &'a dyn CommandRunner,
    pub reporter: &'a Reporter,
    pub cancel: &'a CancellationToken,
    pub configuration: BuildConfiguration,
}

impl StageContext<'_> {
    /// Runs an external command through the configured runner.
    pub async fn run(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        self.runner.run(invocation, self.cancel).await
    }

    pub fn dry_run(&self) -> bool {
        self.settings.dry_run()
    }

    /// Fails with [`Error::Cancelled`] once the run has been cancelled.
    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
