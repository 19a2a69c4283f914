//! Universal macOS bundle assembly.
//!
//! Publishes a .NET project once per CPU architecture, merges the two
//! self-contained builds into one `.app` with a shared pool of identical
//! files, then signs, packages, images and notarizes it.
//!
//! External tools are reached only through the [`CommandRunner`] seam, and
//! progress is reported as [`LogEvent`]s through a [`Reporter`].

pub mod builder;
mod context;
pub mod error;
pub mod events;
pub mod platform;
pub mod runner;
pub mod settings;
pub mod utils;

pub use builder::{
    AssemblyReport, BundleAssembler, BundleLayout, DedupReport, DuplicateLink, FileHash,
    IdentityKind, MissingIdentity, PipelineDriver, PublishResult, RunOutcome, Stage,
    deduplicate, hash_file, missing_tools, verify_identities,
};
pub use context::StageContext;
pub use error::{Error, Result};
pub use events::{EventSink, Level, LogEvent, RecordingSink, Reporter};
pub use runner::{CommandOutcome, CommandRunner, DryRunRunner, Invocation, SystemRunner};
pub use settings::{
    ArchitectureTarget, BuildConfiguration, DEFAULT_NOTARIZE_PROFILE, DEFAULT_OUTPUT_DIR,
    Settings, SettingsBuilder, default_version,
};
