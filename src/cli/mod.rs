//! Command line interface for the universal bundler.
//!
//! Parses arguments, runs the preflight checks, wires Ctrl-C to the shared
//! cancellation token and maps the pipeline outcome to an exit code.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::bundler::{
    BundleAssembler, CommandRunner, PipelineDriver, Reporter, RunOutcome, Settings, SystemRunner,
    builder::{EXIT_CANCELLED, REQUIRED_TOOLS},
    missing_tools,
    utils::fs,
    verify_identities,
};
use crate::error::{BundlerError, CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    let config = RuntimeConfig::from(&args);

    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let settings = Arc::new(args.to_settings()?);

    execute(settings, &config).await
}

/// Runs the whole pipeline for already validated settings.
pub async fn execute(settings: Arc<Settings>, config: &RuntimeConfig) -> Result<i32> {
    let started = Instant::now();
    let output = config.output().clone();
    let reporter = Reporter::new(Arc::new(output.clone()));
    let cancel = CancellationToken::new();

    config.section(&format!(
        "Bundling {} {}",
        settings.project_name(),
        settings.version()
    ))?;
    print_settings(&settings, config)?;

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl-C received, canceling");
                cancel.cancel();
            }
        })
    };

    match preflight(&settings, &reporter, &cancel).await {
        Err(BundlerError::Bundler(e)) if e.is_cancelled() => {
            ctrl_c.abort();
            config.error("Canceled")?;
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => {
            ctrl_c.abort();
            return Err(e);
        }
        Ok(()) => {}
    }

    if settings.dry_run() {
        reporter.dry_run(format_args!(
            "Created output directory {}",
            settings.output_dir().display()
        ));
    } else if let Err(e) = fs::create_dir_all(settings.output_dir(), false).await {
        ctrl_c.abort();
        return Err(e.into());
    }

    // Dry-run settings make the assembler report instead of run.
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let assembler = BundleAssembler::new(settings.clone(), runner, reporter, cancel);
    let outcome = PipelineDriver::new(assembler).run().await;
    ctrl_c.abort();

    report_outcome(&outcome, config)?;
    config.indent(&format!(
        "Time Elapsed: {:.2} seconds.",
        started.elapsed().as_secs_f64()
    ))?;

    Ok(outcome.exit_code())
}

/// Checks tools and keychain identities before any configuration starts.
async fn preflight(
    settings: &Settings,
    reporter: &Reporter,
    cancel: &CancellationToken,
) -> Result<()> {
    if !settings.dry_run() {
        let missing = missing_tools(REQUIRED_TOOLS);
        if !missing.is_empty() {
            return Err(CliError::MissingTools { tools: missing }.into());
        }
    }

    // Read-only, so it runs for real even in dry-run mode.
    if let Some(missing) = verify_identities(settings, &SystemRunner, reporter, cancel).await? {
        return Err(CliError::MissingIdentity {
            identity: missing.identity,
        }
        .into());
    }

    Ok(())
}

fn print_settings(settings: &Settings, config: &RuntimeConfig) -> std::io::Result<()> {
    config.verbose_println(&format!("  Project:        {}", settings.project_file().display()))?;
    config.verbose_println(&format!("  Output:         {}", settings.output_dir().display()))?;
    config.verbose_println(&format!("  Plist dir:      {}", settings.plist_dir().display()))?;
    let configurations = settings
        .configurations()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    config.verbose_println(&format!("  Configurations: {}", configurations))?;
    if let Some(identity) = settings.signing_identity() {
        config.verbose_println(&format!("  Signing as:     {}", identity))?;
    }
    if let Some(identity) = settings.installer_identity() {
        config.verbose_println(&format!("  Installer as:   {}", identity))?;
    }
    if let Some(profile) = settings.notarize_profile() {
        config.verbose_println(&format!("  Notarize with:  {}", profile))?;
    }
    Ok(())
}

fn report_outcome(outcome: &RunOutcome, config: &RuntimeConfig) -> std::io::Result<()> {
    match outcome {
        RunOutcome::Completed(reports) => {
            for report in reports {
                if let Some(dmg) = &report.disk_image {
                    config.indent(&format!("{}: {}", report.configuration, dmg.display()))?;
                }
                if let Some(sha) = &report.disk_image_sha256 {
                    config.indent(&format!("  SHA256: {}", sha))?;
                }
            }
            config.success("Done")
        }
        RunOutcome::Failed {
            configuration,
            stage,
            reason,
        } => {
            let location = match stage {
                Some(stage) => format!("[{}] {} failed", configuration, stage),
                None => format!("[{}] failed", configuration),
            };
            config.error(&format!("{}: {}", location, reason))?;
            config.error("Canceled")
        }
        RunOutcome::Cancelled => config.error("Canceled"),
    }
}
