//! Per-architecture publishing.
//!
//! Runs `dotnet publish` for one runtime identifier into a scratch directory
//! under the project, then copies the result into the bundle. The two
//! architectures use disjoint scratch and destination paths, so two
//! publishers can run concurrently without coordination.

use std::path::{Path, PathBuf};

use crate::bundler::{
    ArchitectureTarget, BuildConfiguration, Error, Invocation, Result, StageContext,
    utils::fs,
};

/// MSBuild properties passed to every publish.
const PUBLISH_PROPERTIES: &[(&str, &str)] = &[
    ("PublishReadyToRun", "false"),
    ("PublishSingleFile", "true"),
    ("TieredCompilation", "false"),
    ("PublishTrimmed", "false"),
    ("IncludeNativeLibrariesForSelfExtract", "true"),
    ("IncludeAllContentForSelfExtract", "true"),
    ("AppendTargetFrameworkToOutputPath", "false"),
];

/// Warnings that self-contained macOS publishes always emit.
const SUPPRESSED_WARNINGS: &str = "NU3004,CS8002,CS1591,NU1900";

/// Outcome of one architecture publish.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishResult {
    pub architecture: ArchitectureTarget,
    pub success: bool,
    /// `<destination_root>/<rid>`
    pub output_dir: PathBuf,
}

/// Builds the publish invocation for one architecture.
pub fn publish_invocation(
    ctx: &StageContext<'_>,
    architecture: ArchitectureTarget,
    configuration: BuildConfiguration,
) -> Invocation {
    let settings = ctx.settings;
    let mut invocation = Invocation::new("dotnet")
        .arg("publish")
        .path_arg(settings.project_file())
        .args(["--configuration", configuration.as_str()])
        .args(["--runtime", architecture.runtime_identifier()])
        .arg("--output")
        .path_arg(settings.publish_scratch_dir(configuration, architecture))
        .arg(format!("-p:AssemblyVersion={}", settings.version()));

    for (name, value) in PUBLISH_PROPERTIES {
        invocation = invocation.arg(format!("-p:{name}={value}"));
    }

    invocation
        .arg(format!("-p:DebugSymbols={}", configuration.debug_symbols()))
        .arg(format!("-nowarn:{SUPPRESSED_WARNINGS}"))
        .arg("--self-contained")
        .current_dir(settings.project_dir())
}

/// Publishes one architecture and copies it to `destination_root/<rid>`.
///
/// A failing build is reported and returned as `success == false`; only
/// cancellation and copy errors surface as `Err`.
pub async fn publish(
    ctx: &StageContext<'_>,
    architecture: ArchitectureTarget,
    configuration: BuildConfiguration,
    destination_root: &Path,
) -> Result<PublishResult> {
    let output_dir = destination_root.join(architecture.runtime_identifier());
    let scratch_dir = ctx.settings.publish_scratch_dir(configuration, architecture);

    ctx.ensure_not_cancelled()?;
    ctx.reporter
        .info(format!("Publishing for RID: {}", architecture));

    // Dry runs go through the DryRunRunner, which only reports.
    let outcome = ctx
        .run(&publish_invocation(ctx, architecture, configuration))
        .await?;

    if !outcome.success() {
        ctx.reporter.error(format!(
            "Publish failed for {} (exit code {}):\n{}",
            architecture,
            outcome.exit_code,
            outcome.diagnostics()
        ));
        return Ok(PublishResult {
            architecture,
            success: false,
            output_dir,
        });
    }

    log::debug!("Publish output for {}:\n{}", architecture, outcome.stdout);
    ctx.reporter
        .success(format!("Publish for {} succeeded.", architecture));

    if ctx.dry_run() {
        ctx.reporter.dry_run(format_args!(
            "Copied {} to {}.",
            scratch_dir.display(),
            output_dir.display()
        ));
    } else {
        fs::copy_dir(&scratch_dir, &output_dir, ctx.cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::GenericError(format!(
                    "copying {} output into bundle: {}",
                    architecture, other
                )),
            })?;
    }

    Ok(PublishResult {
        architecture,
        success: true,
        output_dir,
    })
}
