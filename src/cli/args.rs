//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with environment
//! fallbacks for the signing identities and validation of the project and
//! version inputs.

use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

use crate::bundler::{
    BuildConfiguration, DEFAULT_NOTARIZE_PROFILE, Settings, SettingsBuilder,
};

/// Two to four dot-separated numeric components, e.g. `1.2` or `25.3.14.930`.
const VERSION_PATTERN: &str = r"^\d+(\.\d+){1,3}$";

/// Project file extensions accepted as `PROJECT`.
const PROJECT_EXTENSIONS: [&str; 2] = ["csproj", "sln"];

/// Universal macOS bundle assembler for .NET applications
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_universal",
    version,
    about = "Universal macOS bundle assembler for .NET applications",
    long_about = "Publishes a .NET project for osx-x64 and osx-arm64, merges both builds into one .app
with a shared pool of identical files, then signs, packages and notarizes it.

Usage:
  kodegen_bundler_universal MyApp/MyApp.csproj --dry-run
  kodegen_bundler_universal MyApp.csproj --identity \"Developer ID Application: Me (TEAM)\" --notarize
  kodegen_bundler_universal MyApp.sln -c Release --assembly-version 1.4.0

Exit code 0 = every configuration completed, 130 = canceled."
)]
pub struct Args {
    /// Project or solution file (.csproj or .sln)
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Output directory [default: <project dir>/bin/UniversalBundleApp]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory holding Info.plist and Entitlements.plist [default: project dir]
    #[arg(long, value_name = "DIR")]
    pub plist_dir: Option<PathBuf>,

    /// Code signing identity (Developer ID Application)
    #[arg(short = 'i', long, env = "MACOS_SIGNING_IDENTITY", value_name = "IDENTITY")]
    pub identity: Option<String>,

    /// Installer signing identity (Developer ID Installer)
    #[arg(long, env = "MACOS_INSTALLER_IDENTITY", value_name = "IDENTITY")]
    pub installer_identity: Option<String>,

    /// Bundle version [default: local time as yy.MM.dd.HHmm]
    #[arg(long = "assembly-version", value_name = "VERSION")]
    pub assembly_version: Option<String>,

    /// Notarize the disk image, optionally naming the keychain profile
    #[arg(long, value_name = "PROFILE", num_args = 0..=1)]
    pub notarize: Option<Option<String>>,

    /// Keychain profile used when --notarize is given without one
    #[arg(long, env = "MACOS_NOTARIZE_PROFILE", value_name = "PROFILE", hide_short_help = true)]
    pub notarize_profile: Option<String>,

    /// Configuration to build; repeat for several [default: Debug and Release]
    #[arg(short = 'c', long = "configuration", value_enum, value_name = "CONFIGURATION")]
    pub configurations: Vec<BuildConfiguration>,

    /// Report every action without running commands or touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resolved settings before starting
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let extension = self
            .project
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !PROJECT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(format!(
                "Project must be a .csproj or .sln file: {}",
                self.project.display()
            ));
        }
        if !self.project.is_file() {
            return Err(format!(
                "Project file not found: {}",
                self.project.display()
            ));
        }

        if let Some(version) = &self.assembly_version {
            let pattern = Regex::new(VERSION_PATTERN).map_err(|e| e.to_string())?;
            if !pattern.is_match(version) {
                return Err(format!(
                    "Invalid version '{}': expected 2 to 4 numeric components, e.g. 1.2.3",
                    version
                ));
            }
        }

        if let Some(dir) = &self.plist_dir
            && !dir.is_dir()
        {
            return Err(format!("Plist directory not found: {}", dir.display()));
        }

        Ok(())
    }

    /// Keychain profile to notarize with, if notarization was requested.
    pub fn notarize_profile(&self) -> Option<String> {
        let requested = self.notarize.as_ref()?;
        Some(
            requested
                .clone()
                .or_else(|| self.notarize_profile.clone())
                .unwrap_or_else(|| DEFAULT_NOTARIZE_PROFILE.to_string()),
        )
    }

    /// Builds validated [`Settings`] from the arguments.
    pub fn to_settings(&self) -> crate::bundler::Result<Settings> {
        let mut builder = SettingsBuilder::new()
            .project_file(&self.project)
            .signing_identity(self.identity.clone())
            .installer_identity(self.installer_identity.clone())
            .notarize_profile(self.notarize_profile())
            .dry_run(self.dry_run)
            .configurations(self.configurations.clone());

        if let Some(dir) = &self.output {
            builder = builder.output_dir(dir);
        }
        if let Some(dir) = &self.plist_dir {
            builder = builder.plist_dir(dir);
        }
        if let Some(version) = &self.assembly_version {
            builder = builder.version(version.clone());
        }

        builder.build()
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        let output = super::OutputManager::new(args.verbose);
        Self { output }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    pub fn error(&self, message: &str) -> std::io::Result<()> {
        self.output.error(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}
