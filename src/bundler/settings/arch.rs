//! CPU architecture types and utilities.

use std::fmt;

/// CPU architecture published into the universal bundle.
///
/// A universal bundle carries exactly two self-contained builds side by side
/// under `Contents/MacOS/<rid>/`. The runtime identifier doubles as the
/// directory name, and the launcher script picks one at runtime.
///
/// # Examples
///
/// ```
/// use kodegen_bundler_universal::bundler::ArchitectureTarget;
///
/// assert_eq!(ArchitectureTarget::Arm64.runtime_identifier(), "osx-arm64");
/// assert_eq!(ArchitectureTarget::PRIMARY, ArchitectureTarget::X64);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArchitectureTarget {
    /// x86_64 / Intel Macs
    X64,
    /// AArch64 / Apple Silicon
    Arm64,
}

impl ArchitectureTarget {
    /// Architecture whose directory is the canonical source during deduplication.
    pub const PRIMARY: ArchitectureTarget = ArchitectureTarget::X64;

    /// The other architecture.
    pub const SECONDARY: ArchitectureTarget = ArchitectureTarget::Arm64;

    /// Both architectures, primary first.
    pub const ALL: [ArchitectureTarget; 2] = [Self::PRIMARY, Self::SECONDARY];

    /// .NET runtime identifier, also the bundle subdirectory name.
    pub fn runtime_identifier(&self) -> &'static str {
        match self {
            ArchitectureTarget::X64 => "osx-x64",
            ArchitectureTarget::Arm64 => "osx-arm64",
        }
    }
}

impl fmt::Display for ArchitectureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runtime_identifier())
    }
}
