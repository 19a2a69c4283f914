//! Build configurations.

use std::fmt;

/// Build configuration label; one full pipeline run per value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum BuildConfiguration {
    /// Debug build with symbols
    #[value(name = "Debug", alias = "debug")]
    Debug,
    /// Optimized build
    #[value(name = "Release", alias = "release")]
    Release,
}

impl BuildConfiguration {
    /// Default run order.
    pub const ALL: [BuildConfiguration; 2] = [Self::Debug, Self::Release];

    /// Name as passed to the build tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfiguration::Debug => "Debug",
            BuildConfiguration::Release => "Release",
        }
    }

    /// Whether debug symbols are emitted.
    pub fn debug_symbols(&self) -> bool {
        matches!(self, BuildConfiguration::Debug)
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
