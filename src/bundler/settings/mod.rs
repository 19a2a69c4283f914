//! Configuration structures for bundle assembly.
//!
//! This module provides the configuration types for a universal bundle run:
//! the two architecture targets, the build configurations, and the
//! [`Settings`] that every pipeline stage reads from.

mod arch;
mod builder;
mod configuration;
mod core;

// Re-export all public types
pub use arch::ArchitectureTarget;
pub use builder::{DEFAULT_NOTARIZE_PROFILE, DEFAULT_OUTPUT_DIR, SettingsBuilder, default_version};
pub use configuration::BuildConfiguration;
pub use self::core::Settings;
