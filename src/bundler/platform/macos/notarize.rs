//! Notarization of the disk image with `notarytool` and `stapler`.
//!
//! Credentials live in a keychain profile created beforehand with
//! `xcrun notarytool store-credentials`; only the profile name is passed.

use std::path::Path;

use crate::bundler::{Invocation, Result, StageContext};

/// Submits `disk_image` for notarization, waits for the verdict and staples
/// the ticket. Every step is fatal.
pub async fn notarize(ctx: &StageContext<'_>, disk_image: &Path, profile: &str) -> Result<()> {
    ctx.ensure_not_cancelled()?;
    let availability = ctx
        .run(&Invocation::new("xcrun").args(["notarytool", "help"]))
        .await?;
    if !availability.success() {
        crate::bail!(
            "notarytool is not available; install Xcode 13 or later:\n{}",
            availability.diagnostics()
        );
    }

    ctx.ensure_not_cancelled()?;
    ctx.reporter.info(format!(
        "Submitting {} for notarization (profile '{}')...",
        disk_image.display(),
        profile
    ));
    let submission = ctx
        .run(
            &Invocation::new("xcrun")
                .args(["notarytool", "submit"])
                .path_arg(disk_image)
                .args(["--keychain-profile", profile, "--wait"]),
        )
        .await?;
    if !submission.success() {
        crate::bail!("Notarization failed:\n{}", submission.diagnostics());
    }
    log::debug!("notarytool output: {}", submission.stdout.trim());

    ctx.ensure_not_cancelled()?;
    let staple = ctx
        .run(
            &Invocation::new("xcrun")
                .args(["stapler", "staple"])
                .path_arg(disk_image),
        )
        .await?;
    if !staple.success() {
        crate::bail!(
            "Failed to staple notarization ticket to {}:\n{}",
            disk_image.display(),
            staple.diagnostics()
        );
    }

    ctx.reporter
        .success(format!("Notarized and stapled {}", disk_image.display()));
    Ok(())
}
