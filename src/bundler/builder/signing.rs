//! Signing identity preflight.
//!
//! A signing identity that is not in the keychain would only fail at the
//! first `codesign` call, after both architectures have been published.
//! This check runs before any configuration starts.

use tokio_util::sync::CancellationToken;

use crate::bundler::{CommandRunner, Invocation, Reporter, Result, Settings};

/// Why the identity preflight rejected the run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingIdentity {
    pub identity: String,
    pub kind: IdentityKind,
}

/// Which certificate an identity is used for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentityKind {
    /// `codesign` identity (Developer ID Application).
    CodeSigning,
    /// `productbuild` identity (Developer ID Installer).
    Installer,
}

impl IdentityKind {
    fn lookup(&self) -> Invocation {
        match self {
            IdentityKind::CodeSigning => {
                Invocation::new("security").args(["find-identity", "-v", "-p", "codesigning"])
            }
            IdentityKind::Installer => Invocation::new("security").args(["find-identity", "-v"]),
        }
    }
}

/// Checks that every configured identity is present in the keychain.
///
/// Read-only, so it also runs in dry-run mode. Returns the first identity
/// that could not be found.
pub async fn verify_identities(
    settings: &Settings,
    runner: &dyn CommandRunner,
    reporter: &Reporter,
    cancel: &CancellationToken,
) -> Result<Option<MissingIdentity>> {
    let wanted = [
        (settings.signing_identity(), IdentityKind::CodeSigning),
        (settings.installer_identity(), IdentityKind::Installer),
    ];

    for (identity, kind) in wanted {
        let Some(identity) = identity else {
            continue;
        };

        let outcome = runner.run(&kind.lookup(), cancel).await?;
        if !outcome.success() || !outcome.stdout.contains(identity) {
            reporter.error(format!(
                "Signing identity '{}' not found in keychain.",
                identity
            ));
            if !outcome.success() {
                log::debug!("security find-identity failed: {}", outcome.diagnostics());
            }
            return Ok(Some(MissingIdentity {
                identity: identity.to_string(),
                kind,
            }));
        }

        log::debug!("Found signing identity '{}'", identity);
    }

    Ok(None)
}
