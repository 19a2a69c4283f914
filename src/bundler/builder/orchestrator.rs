//! Per-configuration bundle assembly.
//!
//! This module provides the [`BundleAssembler`] that drives one build
//! configuration through the stage sequence
//!
//! ```text
//! Skeleton → Publish (x64 ∥ arm64) → Dedup → MetadataPatch → Sign?
//!          → InstallerPackage? → DiskImage → Notarize? → Done
//! ```
//!
//! Each stage starts only after the previous one succeeded. Cancellation is
//! checked before every stage; a raised token ends the configuration with
//! [`Error::Cancelled`], never with a failure.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    checksum::hash_file,
    dedup::{DedupReport, deduplicate},
    layout::{BundleLayout, launcher_script},
    publisher,
    stage::Stage,
};
use crate::bundler::{
    ArchitectureTarget, BuildConfiguration, CommandRunner, DryRunRunner, Error, Reporter, Result,
    Settings, StageContext,
    error::ErrorExt,
    platform::macos::{dmg, installer, metadata, notarize, sign},
    utils::fs,
};

/// What one successful configuration produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyReport {
    pub configuration: BuildConfiguration,
    pub bundle_dir: PathBuf,
    /// Stages that ran to completion, in order. Ends with [`Stage::Done`].
    pub completed_stages: Vec<Stage>,
    pub dedup: Option<DedupReport>,
    pub installer: Option<PathBuf>,
    pub disk_image: Option<PathBuf>,
    /// Hex SHA-256 of the disk image. Not computed in dry runs.
    pub disk_image_sha256: Option<String>,
}

impl AssemblyReport {
    fn new(configuration: BuildConfiguration, bundle_dir: PathBuf) -> Self {
        Self {
            configuration,
            bundle_dir,
            completed_stages: Vec::new(),
            dedup: None,
            installer: None,
            disk_image: None,
            disk_image_sha256: None,
        }
    }
}

/// Assembles the universal bundle for one configuration at a time.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use kodegen_bundler_universal::bundler::{
///     BuildConfiguration, BundleAssembler, RecordingSink, Reporter, SettingsBuilder,
///     SystemRunner,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> kodegen_bundler_universal::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_file("MyApp/MyApp.csproj")
///     .version("1.2.3.4")
///     .build()?;
///
/// let assembler = BundleAssembler::new(
///     Arc::new(settings),
///     Arc::new(SystemRunner),
///     Reporter::new(Arc::new(RecordingSink::new())),
///     CancellationToken::new(),
/// );
/// let report = assembler.assemble(BuildConfiguration::Release).await?;
/// println!("Disk image: {:?}", report.disk_image);
/// # Ok(())
/// # }
/// ```
pub struct BundleAssembler {
    settings: Arc<Settings>,
    runner: Arc<dyn CommandRunner>,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl std::fmt::Debug for BundleAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleAssembler")
            .field("settings", &self.settings)
            .field("runner", &"<dyn CommandRunner>")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl BundleAssembler {
    /// Creates an assembler. With dry-run settings every command goes to a
    /// [`DryRunRunner`] and `runner` is never called.
    pub fn new(
        settings: Arc<Settings>,
        runner: Arc<dyn CommandRunner>,
        reporter: Reporter,
        cancel: CancellationToken,
    ) -> Self {
        let runner: Arc<dyn CommandRunner> = if settings.dry_run() {
            Arc::new(DryRunRunner::new(reporter.clone()))
        } else {
            runner
        };
        Self {
            settings,
            runner,
            reporter,
            cancel,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs every stage for `configuration`.
    ///
    /// Returns [`Error::StageFailed`] naming the first stage that failed, or
    /// [`Error::Cancelled`] when the token was raised.
    pub async fn assemble(&self, configuration: BuildConfiguration) -> Result<AssemblyReport> {
        let ctx = StageContext {
            settings: self.settings.as_ref(),
            runner: self.runner.as_ref(),
            reporter: &self.reporter,
            cancel: &self.cancel,
            configuration,
        };
        let layout = BundleLayout::new(&self.settings, configuration);
        let mut report = AssemblyReport::new(configuration, layout.bundle_dir.clone());

        self.reporter.info(format!(
            "Building {} bundle {}",
            configuration,
            layout.bundle_dir.display()
        ));

        enter(&ctx, Stage::Skeleton)?;
        build_skeleton(&ctx, &layout)
            .await
            .map_err(stage_failure(configuration, Stage::Skeleton))?;
        report.completed_stages.push(Stage::Skeleton);

        enter(&ctx, Stage::Publish)?;
        publish_all(&ctx, &layout)
            .await
            .map_err(stage_failure(configuration, Stage::Publish))?;
        report.completed_stages.push(Stage::Publish);

        enter(&ctx, Stage::Dedup)?;
        report.dedup = merge_architectures(&ctx, &layout).await?;
        report.completed_stages.push(Stage::Dedup);

        enter(&ctx, Stage::MetadataPatch)?;
        if self.settings.entitlements_source().exists() {
            metadata::patch_versions(&ctx, &layout.info_plist)
                .await
                .map_err(stage_failure(configuration, Stage::MetadataPatch))?;
        } else {
            log::debug!("No entitlements file; leaving Info.plist version untouched");
        }
        report.completed_stages.push(Stage::MetadataPatch);

        if let Some(identity) = self.settings.signing_identity() {
            enter(&ctx, Stage::Sign)?;
            sign::sign_bundle(&ctx, &layout, identity)
                .await
                .map_err(stage_failure(configuration, Stage::Sign))?;
            report.completed_stages.push(Stage::Sign);
        }

        if let Some(identity) = self.settings.installer_identity() {
            enter(&ctx, Stage::InstallerPackage)?;
            let package = installer::build_installer(&ctx, &layout, identity)
                .await
                .map_err(stage_failure(configuration, Stage::InstallerPackage))?;
            report.installer = Some(package);
            report.completed_stages.push(Stage::InstallerPackage);
        }

        enter(&ctx, Stage::DiskImage)?;
        let disk_image = dmg::bundle_disk_image(&ctx)
            .await
            .map_err(stage_failure(configuration, Stage::DiskImage))?;
        if !ctx.dry_run() {
            let hash = hash_file(&disk_image)
                .await
                .map_err(stage_failure(configuration, Stage::DiskImage))?;
            log::info!("SHA256 {}: {}", disk_image.display(), hash);
            report.disk_image_sha256 = Some(hash.to_string());
        }
        report.disk_image = Some(disk_image.clone());
        report.completed_stages.push(Stage::DiskImage);

        if let Some(profile) = self.settings.notarize_profile() {
            enter(&ctx, Stage::Notarize)?;
            notarize::notarize(&ctx, &disk_image, profile)
                .await
                .map_err(stage_failure(configuration, Stage::Notarize))?;
            report.completed_stages.push(Stage::Notarize);
        }

        report.completed_stages.push(Stage::Done);
        self.reporter.success(format!(
            "{} bundle complete: {}",
            configuration,
            layout.bundle_dir.display()
        ));
        Ok(report)
    }
}

fn enter(ctx: &StageContext<'_>, stage: Stage) -> Result<()> {
    ctx.ensure_not_cancelled()?;
    log::debug!("[{}] entering stage: {}", ctx.configuration, stage);
    Ok(())
}

/// Tags a stage error with where it happened. Cancellation passes through.
fn stage_failure(configuration: BuildConfiguration, stage: Stage) -> impl FnOnce(Error) -> Error {
    move |error| match error {
        Error::Cancelled => Error::Cancelled,
        failed @ Error::StageFailed { .. } => failed,
        other => Error::StageFailed {
            configuration,
            stage,
            reason: other.to_string(),
        },
    }
}

/// Recreates the bundle tree, launcher, `Info.plist` and resources.
async fn build_skeleton(ctx: &StageContext<'_>, layout: &BundleLayout) -> Result<()> {
    let info_plist_source = ctx.settings.info_plist_source();
    if !info_plist_source.is_file() {
        crate::bail!("Info.plist not found at {}", info_plist_source.display());
    }
    let assets = ctx.settings.assets_dir();

    if ctx.dry_run() {
        ctx.reporter
            .dry_run(format_args!("Recreated {}", layout.bundle_dir.display()));
        ctx.reporter
            .dry_run(format_args!("Wrote launcher {}", layout.launcher.display()));
        ctx.reporter.dry_run(format_args!(
            "Copied {} to {}",
            info_plist_source.display(),
            layout.info_plist.display()
        ));
        if assets.is_dir() {
            ctx.reporter.dry_run(format_args!(
                "Copied {} to {}",
                assets.display(),
                layout.resources_dir.display()
            ));
        }
        return Ok(());
    }

    fs::create_dir_all(&layout.bundle_dir, true).await?;
    for dir in layout.directories() {
        fs::create_dir_all(&dir, false).await?;
    }

    tokio::fs::write(&layout.launcher, launcher_script(ctx.settings.project_name()))
        .await
        .fs_context("writing launcher script", &layout.launcher)?;
    fs::make_executable(&layout.launcher).await?;

    fs::copy_file(&info_plist_source, &layout.info_plist).await?;

    if assets.is_dir() {
        fs::copy_dir(&assets, &layout.resources_dir, ctx.cancel).await?;
    } else {
        log::debug!("No assets directory at {}", assets.display());
    }

    ctx.reporter.success(format!(
        "Bundle skeleton created at {}",
        layout.bundle_dir.display()
    ));
    Ok(())
}

/// Publishes both architectures concurrently and waits for both.
async fn publish_all(ctx: &StageContext<'_>, layout: &BundleLayout) -> Result<()> {
    let configuration = ctx.configuration;
    let (primary, secondary) = tokio::join!(
        publisher::publish(
            ctx,
            ArchitectureTarget::PRIMARY,
            configuration,
            &layout.macos_dir
        ),
        publisher::publish(
            ctx,
            ArchitectureTarget::SECONDARY,
            configuration,
            &layout.macos_dir
        ),
    );

    // Cancellation wins over a failure reported by the other task.
    let results = [primary, secondary];
    if results.iter().any(|r| matches!(r, Err(Error::Cancelled))) {
        return Err(Error::Cancelled);
    }

    let mut failed = Vec::new();
    for result in results {
        let result = result?;
        if !result.success {
            failed.push(result.architecture.to_string());
        }
    }

    if !failed.is_empty() {
        crate::bail!("dotnet publish failed for {}", failed.join(", "));
    }
    Ok(())
}

/// Deduplication problems leave a larger but working bundle, so they are
/// warnings.
async fn merge_architectures(
    ctx: &StageContext<'_>,
    layout: &BundleLayout,
) -> Result<Option<DedupReport>> {
    let dir_a = layout.architecture_dir(ArchitectureTarget::PRIMARY);
    let dir_b = layout.architecture_dir(ArchitectureTarget::SECONDARY);

    if ctx.dry_run() {
        ctx.reporter.dry_run(format_args!(
            "Deduplicated {} and {} into {}",
            dir_a.display(),
            dir_b.display(),
            layout.shared_dir.display()
        ));
        return Ok(None);
    }

    ctx.reporter.info("Deduplicating architecture outputs...");
    match deduplicate(&dir_a, &dir_b, &layout.shared_dir, ctx.cancel, ctx.reporter).await {
        Ok(report) if report.cancelled => Err(Error::Cancelled),
        Ok(report) => {
            ctx.reporter.success(format!(
                "Deduplication linked {} files into {}",
                report.links.len(),
                layout.shared_dir.display()
            ));
            Ok(Some(report))
        }
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            ctx.reporter.warn(format!("Deduplication failed: {}", e));
            Ok(None)
        }
    }
}
