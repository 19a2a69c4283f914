//! Core Settings struct and implementations.

use super::{ArchitectureTarget, BuildConfiguration};
use std::path::{Path, PathBuf};

/// Main settings for a bundle pipeline run.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder). All paths are
/// absolute once built, so the layout helpers below never depend on the
/// current directory.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_universal::bundler::{BuildConfiguration, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_universal::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_file("src/MyApp/MyApp.csproj")
///     .version("1.2.3.4")
///     .build()?;
///
/// let bundle = settings.bundle_dir(BuildConfiguration::Release);
/// assert!(bundle.ends_with("Release/MyApp.app"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    /// `.csproj` or `.sln` passed to the build tool.
    project_file: PathBuf,

    /// Project file name without extension; names the bundle and the binary.
    project_name: String,

    /// Directory holding the project file. Publish scratch output and
    /// `Assets/` live here.
    project_dir: PathBuf,

    /// Root of all generated bundles, installers and the disk image source.
    output_dir: PathBuf,

    /// Directory holding `Info.plist` and the optional `Entitlements.plist`.
    plist_dir: PathBuf,

    /// Code signing identity (Developer ID Application).
    signing_identity: Option<String>,

    /// Installer signing identity (Developer ID Installer).
    installer_identity: Option<String>,

    /// Version written to the assembly and to `Info.plist`.
    version: String,

    /// Keychain profile for `notarytool`; `None` disables notarization.
    notarize_profile: Option<String>,

    /// Report actions without touching the filesystem or running tools.
    dry_run: bool,

    /// Configurations to assemble, in order.
    configurations: Vec<BuildConfiguration>,
}

impl Settings {
    /// Returns the project file.
    pub fn project_file(&self) -> &Path {
        &self.project_file
    }

    /// Returns the product name (project file stem).
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Returns the project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns the output root.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the directory searched for plist inputs.
    pub fn plist_dir(&self) -> &Path {
        &self.plist_dir
    }

    /// Returns the version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the code signing identity, if configured.
    pub fn signing_identity(&self) -> Option<&str> {
        self.signing_identity.as_deref()
    }

    /// Returns the installer signing identity, if configured.
    pub fn installer_identity(&self) -> Option<&str> {
        self.installer_identity.as_deref()
    }

    /// Returns the notarization keychain profile when notarization is requested.
    pub fn notarize_profile(&self) -> Option<&str> {
        self.notarize_profile.as_deref()
    }

    /// Whether this is a dry run.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the configurations to assemble.
    pub fn configurations(&self) -> &[BuildConfiguration] {
        &self.configurations
    }

    /// `<Project>.app`
    pub fn bundle_name(&self) -> String {
        format!("{}.app", self.project_name)
    }

    /// `<output>/<Configuration>/<Project>.app`
    pub fn bundle_dir(&self, configuration: BuildConfiguration) -> PathBuf {
        self.output_dir
            .join(configuration.as_str())
            .join(self.bundle_name())
    }

    /// Required bundle manifest input.
    pub fn info_plist_source(&self) -> PathBuf {
        self.plist_dir.join("Info.plist")
    }

    /// Optional entitlements input. Its presence also enables version patching.
    pub fn entitlements_source(&self) -> PathBuf {
        self.plist_dir.join("Entitlements.plist")
    }

    /// Optional resources copied into `Contents/Resources`.
    pub fn assets_dir(&self) -> PathBuf {
        self.project_dir.join("Assets")
    }

    /// Scratch directory the build tool publishes into for one architecture.
    pub fn publish_scratch_dir(
        &self,
        configuration: BuildConfiguration,
        architecture: ArchitectureTarget,
    ) -> PathBuf {
        self.project_dir
            .join("bin")
            .join(configuration.as_str())
            .join(architecture.runtime_identifier())
            .join("publish")
    }

    /// `<output>/<Project>-<version>-<Configuration>.pkg`
    pub fn installer_path(&self, configuration: BuildConfiguration) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}-{}.pkg",
            self.project_name, self.version, configuration
        ))
    }

    /// Disk image path, stored next to (not inside) the output root.
    pub fn disk_image_path(&self, configuration: BuildConfiguration) -> PathBuf {
        let name = format!(
            "{}-{}-{}.dmg",
            self.project_name, self.version, configuration
        );
        match self.output_dir.parent() {
            Some(parent) => parent.join(name),
            None => self.output_dir.join("..").join(name),
        }
    }

    /// Convenience `/Applications` link placed in the disk image source.
    pub fn applications_link(&self) -> PathBuf {
        self.output_dir.join("Applications")
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        project_file: PathBuf,
        project_name: String,
        project_dir: PathBuf,
        output_dir: PathBuf,
        plist_dir: PathBuf,
        signing_identity: Option<String>,
        installer_identity: Option<String>,
        version: String,
        notarize_profile: Option<String>,
        dry_run: bool,
        configurations: Vec<BuildConfiguration>,
    ) -> Self {
        Self {
            project_file,
            project_name,
            project_dir,
            output_dir,
            plist_dir,
            signing_identity,
            installer_identity,
            version,
            notarize_profile,
            dry_run,
            configurations,
        }
    }
}
