//! Core DMG creation using hdiutil.
//!
//! The image is built from the whole output directory, so the bundle sits
//! next to an `Applications` link for drag-to-install. The link only exists
//! while `hdiutil` runs.

use std::path::{Path, PathBuf};

use crate::bundler::{Invocation, Result, StageContext};

/// Deletes Finder metadata files anywhere below `root`. A failure only
/// leaves clutter in the image, so it is a warning.
pub async fn remove_finder_metadata(ctx: &StageContext<'_>, root: &Path) -> Result<()> {
    let outcome = ctx
        .run(
            &Invocation::new("find")
                .path_arg(root)
                .args(["-name", ".DS_Store", "-delete"]),
        )
        .await?;
    if !outcome.success() {
        ctx.reporter.warn(format!(
            "Failed to remove .DS_Store files:\n{}",
            outcome.diagnostics()
        ));
    }
    Ok(())
}

/// Creates `link -> /Applications` unless something is already there.
///
/// Returns whether this call created the link, so that only a link we made
/// gets removed afterwards.
pub async fn create_applications_link(ctx: &StageContext<'_>, link: &Path) -> Result<bool> {
    if tokio::fs::symlink_metadata(link).await.is_ok() {
        log::debug!("Applications link already present: {}", link.display());
        return Ok(false);
    }

    let outcome = ctx
        .run(
            &Invocation::new("ln")
                .args(["-s", "/Applications"])
                .path_arg(link),
        )
        .await?;
    if !outcome.success() {
        ctx.reporter.warn(format!(
            "Failed to create Applications link:\n{}",
            outcome.diagnostics()
        ));
        return Ok(false);
    }
    Ok(true)
}

/// Runs `hdiutil create` with UDZO compression, overwriting an older image.
pub async fn create_dmg(
    ctx: &StageContext<'_>,
    source_folder: &Path,
    dmg_path: &Path,
) -> Result<PathBuf> {
    log::info!("Creating DMG with format UDZO...");

    let invocation = Invocation::new("hdiutil")
        .arg("create")
        .args(["-volname", ctx.settings.project_name()])
        .arg("-srcfolder")
        .path_arg(source_folder)
        .args(["-ov", "-format", "UDZO"])
        .path_arg(dmg_path);

    let outcome = ctx.run(&invocation).await?;
    if !outcome.success() {
        crate::bail!(
            "hdiutil failed to create {}:\n{}",
            dmg_path.display(),
            outcome.diagnostics()
        );
    }

    Ok(dmg_path.to_path_buf())
}
