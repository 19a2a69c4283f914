//! Signed `.pkg` installer creation via `productbuild`.

use std::path::PathBuf;

use crate::bundler::{Invocation, Result, StageContext, builder::BundleLayout};

/// Install location recorded in the package.
pub const INSTALL_LOCATION: &str = "/Applications";

/// Builds `<output>/<Project>-<version>-<Configuration>.pkg` signed with
/// `identity`. A failing `productbuild` aborts the configuration.
pub async fn build_installer(
    ctx: &StageContext<'_>,
    layout: &BundleLayout,
    identity: &str,
) -> Result<PathBuf> {
    let package = ctx.settings.installer_path(ctx.configuration);
    ctx.reporter
        .info(format!("Building installer package {}", package.display()));

    let invocation = Invocation::new("productbuild")
        .args(["--version", ctx.settings.version()])
        .arg("--component")
        .path_arg(&layout.bundle_dir)
        .arg(INSTALL_LOCATION)
        .path_arg(&package)
        .args(["--sign", identity]);

    let outcome = ctx.run(&invocation).await?;
    if !outcome.success() {
        crate::bail!(
            "Failed to build installer package {}:\n{}",
            package.display(),
            outcome.diagnostics()
        );
    }

    ctx.reporter
        .success(format!("Installer package created: {}", package.display()));
    Ok(package)
}
