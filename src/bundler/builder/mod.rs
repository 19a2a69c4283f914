//! Bundle orchestration and coordination.
//!
//! This module provides the [`BundleAssembler`] that turns one .NET project
//! into a universal `.app` bundle per build configuration, and the
//! [`PipelineDriver`] that runs it for every configuration.
//!
//! # Overview
//!
//! For each configuration the assembler:
//! 1. Recreates the bundle skeleton from [`Settings`](crate::bundler::Settings)
//! 2. Publishes the x64 and arm64 builds concurrently
//! 3. Deduplicates identical files into `Contents/MacOS/shared`
//! 4. Patches, signs, packages, images and notarizes as configured
//! 5. Returns an [`AssemblyReport`] with the artifacts and the dmg checksum
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kodegen_bundler_universal::bundler::{
//!     BundleAssembler, PipelineDriver, RecordingSink, Reporter, SettingsBuilder, SystemRunner,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> kodegen_bundler_universal::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project_file("MyApp/MyApp.csproj")
//!     .build()?;
//!
//! let assembler = BundleAssembler::new(
//!     Arc::new(settings),
//!     Arc::new(SystemRunner),
//!     Reporter::new(Arc::new(RecordingSink::new())),
//!     CancellationToken::new(),
//! );
//! let outcome = PipelineDriver::new(assembler).run().await;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 hashing for deduplication and the dmg report
//! - [`dedup`] - Cross-architecture file deduplication
//! - [`layout`] - Bundle paths and the launcher script
//! - [`orchestrator`] - [`BundleAssembler`] and its stages
//! - [`pipeline`] - [`PipelineDriver`] and [`RunOutcome`]
//! - [`publisher`] - Per-architecture `dotnet publish`
//! - [`signing`] - Keychain identity preflight
//! - [`tool_detection`] - External tool availability checking

pub mod checksum;
pub mod dedup;
pub mod layout;
mod orchestrator;
mod pipeline;
pub mod publisher;
pub mod signing;
mod stage;
pub mod tool_detection;

pub use checksum::{FileHash, hash_file};
pub use dedup::{DedupReport, DuplicateLink, deduplicate};
pub use layout::{BundleLayout, SHARED_DIR_NAME, launcher_script};
pub use orchestrator::{AssemblyReport, BundleAssembler};
pub use pipeline::{EXIT_CANCELLED, PipelineDriver, RunOutcome};
pub use publisher::{PublishResult, publish};
pub use signing::{IdentityKind, MissingIdentity, verify_identities};
pub use stage::Stage;
pub use tool_detection::{REQUIRED_TOOLS, missing_tools};
