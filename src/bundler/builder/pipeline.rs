//! Runs the assembler once per build configuration.

use super::{orchestrator::AssemblyReport, stage::Stage, BundleAssembler};
use crate::bundler::{BuildConfiguration, Error};

/// Exit code for a run stopped by cancellation (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// How the whole run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every configuration finished.
    Completed(Vec<AssemblyReport>),
    /// A configuration failed; later ones were not attempted.
    Failed {
        configuration: BuildConfiguration,
        /// `None` when the failure happened outside a stage.
        stage: Option<Stage>,
        reason: String,
    },
    /// The shared cancellation token was raised from outside.
    Cancelled,
}

impl RunOutcome {
    /// `0` on completion, `1` on failure, `130` on cancellation.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Failed { .. } => 1,
            RunOutcome::Cancelled => EXIT_CANCELLED,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Sequential driver over the configured build configurations.
#[derive(Debug)]
pub struct PipelineDriver {
    assembler: BundleAssembler,
}

impl PipelineDriver {
    pub fn new(assembler: BundleAssembler) -> Self {
        Self { assembler }
    }

    /// Assembles each configuration in order, stopping at the first one
    /// that does not complete.
    ///
    /// A failure raises the shared cancellation token so that nothing else
    /// sharing it starts new work.
    pub async fn run(&self) -> RunOutcome {
        let cancel = self.assembler.cancellation_token();
        let configurations = self.assembler.settings().configurations().to_vec();
        let mut reports = Vec::with_capacity(configurations.len());

        for configuration in configurations {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            match self.assembler.assemble(configuration).await {
                Ok(report) => reports.push(report),
                Err(Error::Cancelled) => return RunOutcome::Cancelled,
                Err(error) => {
                    log::error!("{}", error);
                    cancel.cancel();
                    return match error {
                        Error::StageFailed {
                            configuration,
                            stage,
                            reason,
                        } => RunOutcome::Failed {
                            configuration,
                            stage: Some(stage),
                            reason,
                        },
                        other => RunOutcome::Failed {
                            configuration,
                            stage: None,
                            reason: other.to_string(),
                        },
                    };
                }
            }
        }

        RunOutcome::Completed(reports)
    }
}
