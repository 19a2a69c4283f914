//! On-disk layout of a universal `.app` bundle.
//!
//! ```text
//! <Project>.app
//!     Contents
//!         ├── MacOS
//!         │   ├── osx-arm64/   self-contained arm64 build
//!         │   ├── osx-x64/     self-contained x86_64 build
//!         │   ├── shared/      files identical in both builds
//!         │   └── <Project>.sh launcher
//!         ├── Resources/
//!         └── Info.plist
//! ```

use std::path::{Path, PathBuf};

use crate::bundler::{ArchitectureTarget, BuildConfiguration, Settings};

/// Name of the deduplicated pool inside `Contents/MacOS`.
pub const SHARED_DIR_NAME: &str = "shared";

/// Resolved paths of one bundle.
#[derive(Clone, Debug)]
pub struct BundleLayout {
    pub bundle_dir: PathBuf,
    pub contents_dir: PathBuf,
    pub macos_dir: PathBuf,
    pub shared_dir: PathBuf,
    pub resources_dir: PathBuf,
    pub info_plist: PathBuf,
    pub launcher: PathBuf,
}

impl BundleLayout {
    pub fn new(settings: &Settings, configuration: BuildConfiguration) -> Self {
        let bundle_dir = settings.bundle_dir(configuration);
        let contents_dir = bundle_dir.join("Contents");
        let macos_dir = contents_dir.join("MacOS");

        Self {
            shared_dir: macos_dir.join(SHARED_DIR_NAME),
            resources_dir: contents_dir.join("Resources"),
            info_plist: contents_dir.join("Info.plist"),
            launcher: macos_dir.join(format!("{}.sh", settings.project_name())),
            bundle_dir,
            contents_dir,
            macos_dir,
        }
    }

    /// `Contents/MacOS/<rid>`
    pub fn architecture_dir(&self, architecture: ArchitectureTarget) -> PathBuf {
        self.macos_dir.join(architecture.runtime_identifier())
    }

    /// Directories created by the skeleton step, parents first.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.bundle_dir.clone(),
            self.contents_dir.clone(),
            self.macos_dir.clone(),
        ];
        dirs.extend(
            ArchitectureTarget::ALL
                .iter()
                .map(|arch| self.architecture_dir(*arch)),
        );
        dirs.push(self.shared_dir.clone());
        dirs.push(self.resources_dir.clone());
        dirs
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }
}

/// POSIX launcher that execs the build matching the host CPU.
///
/// `hw.optional.arm64` is `1` on Apple Silicon (also under Rosetta) and
/// absent on Intel, where `sysctl -in` prints nothing.
pub fn launcher_script(executable_name: &str) -> String {
    format!(
        r#"#!/bin/sh

DIR=$(dirname "$0")
ARM64=$(sysctl -in hw.optional.arm64 2>/dev/null)

if [ "$ARM64" = "1" ]; then
    exec "$DIR/{arm64}/{name}" "$@"
else
    exec "$DIR/{x64}/{name}" "$@"
fi
"#,
        arm64 = ArchitectureTarget::Arm64.runtime_identifier(),
        x64 = ArchitectureTarget::X64.runtime_identifier(),
        name = executable_name,
    )
}
