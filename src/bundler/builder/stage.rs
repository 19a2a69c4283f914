//! Assembly stages.

use std::fmt;

/// One step of the per-configuration state machine, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Recreate the bundle directory tree, launcher and metadata inputs.
    Skeleton,
    /// Publish both architectures concurrently.
    Publish,
    /// Merge identical top-level files into `shared/`.
    Dedup,
    /// Write the version into `Info.plist`.
    MetadataPatch,
    /// Sign every file, then the bundle.
    Sign,
    /// Build the signed `.pkg` installer.
    InstallerPackage,
    /// Create the compressed `.dmg`.
    DiskImage,
    /// Submit the disk image and staple the ticket.
    Notarize,
    /// Terminal state.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Skeleton => "skeleton",
            Stage::Publish => "publish",
            Stage::Dedup => "deduplication",
            Stage::MetadataPatch => "metadata patch",
            Stage::Sign => "code signing",
            Stage::InstallerPackage => "installer package",
            Stage::DiskImage => "disk image",
            Stage::Notarize => "notarization",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}
