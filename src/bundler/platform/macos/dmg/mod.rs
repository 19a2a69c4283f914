//! macOS DMG disk image creator.
//!
//! Packs the output directory (bundle plus `Applications` link) into a
//! compressed, read-only image next to the output directory.

mod creation;

use std::path::PathBuf;

use crate::bundler::{Result, StageContext, utils::fs};

pub use creation::{create_applications_link, create_dmg, remove_finder_metadata};

/// Builds the disk image for the context's configuration.
///
/// # Process
/// 1. Remove `.DS_Store` files from the output directory
/// 2. Create the `Applications` link for drag-to-install
/// 3. Generate the DMG using hdiutil with UDZO compression
/// 4. Remove the link again, whether or not hdiutil succeeded
pub async fn bundle_disk_image(ctx: &StageContext<'_>) -> Result<PathBuf> {
    let output_dir = ctx.settings.output_dir();
    let dmg_path = ctx.settings.disk_image_path(ctx.configuration);
    let link = ctx.settings.applications_link();

    ctx.reporter
        .info(format!("Creating disk image {}", dmg_path.display()));

    remove_finder_metadata(ctx, output_dir).await?;
    ctx.ensure_not_cancelled()?;

    let created_link = create_applications_link(ctx, &link).await?;
    let result = create_dmg(ctx, output_dir, &dmg_path).await;

    if created_link {
        if ctx.dry_run() {
            ctx.reporter
                .dry_run(format!("removing link {}", link.display()));
        } else if let Err(e) = fs::remove_file_if_exists(&link).await {
            ctx.reporter
                .warn(format!("Failed to remove Applications link: {}", e));
        }
    }

    let dmg_path = result?;
    ctx.reporter
        .success(format!("Disk image created: {}", dmg_path.display()));
    Ok(dmg_path)
}
