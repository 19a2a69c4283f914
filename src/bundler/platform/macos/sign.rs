//! Code signing of the assembled bundle.
//!
//! Every regular file under `Contents/MacOS` is signed on its own first
//! (order does not matter), then the bundle as a whole with entitlements.
//! Links into `shared/` are skipped; their targets are signed directly.

use std::path::{Path, PathBuf};

use crate::bundler::{Error, Invocation, Result, StageContext, builder::BundleLayout};

/// Regular files below `root`, sorted for stable logs.
pub async fn signable_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    })
    .await
    .map_err(|e| Error::GenericError(format!("File walk task panicked: {}", e)))?
}

/// Signs all files, then the bundle; verification results are warnings only.
pub async fn sign_bundle(ctx: &StageContext<'_>, layout: &BundleLayout, identity: &str) -> Result<()> {
    ctx.reporter.info("Starting code signing...");

    // In a dry run the tree was never created; walk whatever exists.
    let files = if layout.macos_dir.exists() {
        signable_files(&layout.macos_dir).await?
    } else {
        Vec::new()
    };

    for file in &files {
        ctx.ensure_not_cancelled()?;
        ctx.reporter.info(format!("Signing {}", file.display()));

        let outcome = ctx
            .run(
                &Invocation::new("codesign")
                    .args(["--force", "--timestamp", "--sign", identity])
                    .path_arg(file),
            )
            .await?;

        if !outcome.success() {
            crate::bail!(
                "Failed to sign file {}:\n{}",
                file.display(),
                outcome.diagnostics()
            );
        }
    }

    ctx.ensure_not_cancelled()?;
    ctx.reporter
        .info(format!("Signing bundle: {}", layout.bundle_dir.display()));

    let entitlements = ctx.settings.entitlements_source();
    let mut bundle_signing = Invocation::new("codesign").args(["--force", "--timestamp"]);
    if entitlements.exists() {
        bundle_signing = bundle_signing.arg("--entitlements").path_arg(&entitlements);
    }
    let bundle_signing = bundle_signing
        .args(["--sign", identity])
        .path_arg(&layout.bundle_dir);

    let outcome = ctx.run(&bundle_signing).await?;
    if !outcome.success() {
        crate::bail!(
            "Failed to sign and apply entitlements to the bundle:\n{}",
            outcome.diagnostics()
        );
    }
    ctx.reporter.success(format!(
        "Signed {} files and the bundle",
        files.len()
    ));

    verify_signature(ctx, layout).await?;
    assess_gatekeeper(ctx, layout).await
}

async fn verify_signature(ctx: &StageContext<'_>, layout: &BundleLayout) -> Result<()> {
    ctx.ensure_not_cancelled()?;
    let outcome = ctx
        .run(
            &Invocation::new("codesign")
                .args(["--verify", "--deep", "--strict", "--verbose=2"])
                .path_arg(&layout.bundle_dir),
        )
        .await?;

    if !outcome.success() {
        ctx.reporter.warn(format!(
            "Bundle codesign verification failed:\n{}",
            outcome.diagnostics()
        ));
    }
    Ok(())
}

async fn assess_gatekeeper(ctx: &StageContext<'_>, layout: &BundleLayout) -> Result<()> {
    ctx.ensure_not_cancelled()?;
    let outcome = ctx
        .run(
            &Invocation::new("spctl")
                .args(["--assess", "--type", "execute", "--verbose=4"])
                .path_arg(&layout.bundle_dir),
        )
        .await?;

    if !outcome.success() {
        ctx.reporter.warn(format!(
            "Bundle not accepted by Gatekeeper:\n{}",
            outcome.diagnostics()
        ));
    }
    Ok(())
}
