//! Universal macOS bundle assembler library
//!
//! This library builds one `.app` bundle that runs natively on Intel and
//! Apple Silicon Macs from a .NET project:
//! - Publishes osx-x64 and osx-arm64 builds concurrently
//! - Deduplicates identical files into a shared pool of relative links
//! - Signs, packages (.pkg), images (.dmg) and notarizes the result
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
