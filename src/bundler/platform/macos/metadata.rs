//! `Info.plist` version patching.

use std::path::Path;

use crate::bundler::{Invocation, Result, StageContext};

/// Apple's plist editor, present on every macOS install.
pub const PLIST_BUDDY: &str = "/usr/libexec/PlistBuddy";

/// Keys set to the bundle version.
pub const VERSION_KEYS: [&str; 2] = ["CFBundleVersion", "CFBundleShortVersionString"];

/// Writes the bundle version into both version keys of `info_plist`.
///
/// A stale version does not stop the bundle from working, so failures are
/// warnings. Returns how many keys were updated.
pub async fn patch_versions(ctx: &StageContext<'_>, info_plist: &Path) -> Result<usize> {
    let version = ctx.settings.version();
    let mut patched = 0;

    for key in VERSION_KEYS {
        ctx.ensure_not_cancelled()?;

        let invocation = Invocation::new(PLIST_BUDDY)
            .arg("-c")
            .arg(format!("Set :{key} {version}"))
            .path_arg(info_plist);

        let outcome = ctx.run(&invocation).await?;
        if outcome.success() {
            patched += 1;
        } else {
            ctx.reporter.warn(format!(
                "Failed to set {} in {}:\n{}",
                key,
                info_plist.display(),
                outcome.diagnostics()
            ));
        }
    }

    if patched == VERSION_KEYS.len() {
        ctx.reporter
            .success(format!("Info.plist version set to {}", version));
    }
    Ok(patched)
}
