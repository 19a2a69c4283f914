//! Builder for constructing Settings.

use super::{BuildConfiguration, Settings};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Default output directory, relative to the project directory.
pub const DEFAULT_OUTPUT_DIR: &str = "bin/UniversalBundleApp";

/// Default `notarytool` keychain profile.
pub const DEFAULT_NOTARIZE_PROFILE: &str = "MacOsPublishProfile";

/// Builder for constructing [`Settings`].
///
/// Provides a fluent API; only the project file is required.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_universal::bundler::{BuildConfiguration, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_universal::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_file("MyApp.csproj")
///     .output_dir("dist")
///     .signing_identity(Some("Developer ID Application: Me (TEAMID)".into()))
///     .notarize_profile(Some("MyProfile".into()))
///     .configurations(vec![BuildConfiguration::Release])
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    project_file: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    plist_dir: Option<PathBuf>,
    signing_identity: Option<String>,
    installer_identity: Option<String>,
    version: Option<String>,
    notarize_profile: Option<String>,
    dry_run: bool,
    configurations: Option<Vec<BuildConfiguration>>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the `.csproj` / `.sln` project file.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn project_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output root.
    ///
    /// Default: `<project_dir>/bin/UniversalBundleApp`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the directory holding `Info.plist` / `Entitlements.plist`.
    ///
    /// Default: the project directory
    pub fn plist_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.plist_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the code signing identity. Blank strings count as unset.
    pub fn signing_identity(mut self, identity: Option<String>) -> Self {
        self.signing_identity = non_blank(identity);
        self
    }

    /// Sets the installer signing identity. Blank strings count as unset.
    pub fn installer_identity(mut self, identity: Option<String>) -> Self {
        self.installer_identity = non_blank(identity);
        self
    }

    /// Sets the bundle version.
    ///
    /// Default: local time as `yy.MM.dd.HHmm`
    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Requests notarization with the given keychain profile.
    pub fn notarize_profile(mut self, profile: Option<String>) -> Self {
        self.notarize_profile = non_blank(profile);
        self
    }

    /// Enables dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the configurations to assemble.
    ///
    /// Default: Debug, then Release
    pub fn configurations(mut self, configurations: Vec<BuildConfiguration>) -> Self {
        self.configurations = Some(configurations);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the project file is missing, has no file stem, or
    /// a path cannot be made absolute.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::{Context, ErrorExt};

        let project_file = self
            .project_file
            .context("project_file is required")?;
        let project_file = absolutize(&project_file)?;

        let project_name = project_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .with_context(|| format!("invalid project file name: {}", project_file.display()))?;

        let project_dir = match project_file.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir().fs_context("reading current directory", ".")?,
        };

        let output_dir = match self.output_dir {
            Some(dir) => absolutize(&dir)?,
            None => project_dir.join(DEFAULT_OUTPUT_DIR),
        };

        let plist_dir = match self.plist_dir {
            Some(dir) => absolutize(&dir)?,
            None => project_dir.clone(),
        };

        let configurations = self
            .configurations
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| BuildConfiguration::ALL.to_vec());

        Ok(Settings::new(
            project_file,
            project_name,
            project_dir,
            output_dir,
            plist_dir,
            self.signing_identity,
            self.installer_identity,
            self.version.unwrap_or_else(default_version),
            self.notarize_profile,
            self.dry_run,
            configurations,
        ))
    }
}

/// Version derived from the local clock, e.g. `25.03.14.0930`.
pub fn default_version() -> String {
    chrono::Local::now().format("%y.%m.%d.%H%M").to_string()
}

fn absolutize(path: &Path) -> crate::bundler::Result<PathBuf> {
    use crate::bundler::error::ErrorExt;

    path.absolutize()
        .map(|p| p.into_owned())
        .fs_context("resolving absolute path", path)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
