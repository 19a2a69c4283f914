//! Error types for bundle assembly.
//!
//! Every failure inside the pipeline is one of three things: an I/O problem
//! (with the path that caused it), a stage that decided the configuration
//! cannot continue, or cancellation. Cancellation is never reported as a
//! failure.

use std::path::{Path, PathBuf};

use super::{BuildConfiguration, Stage};

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while assembling a bundle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw I/O error without path context.
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    /// Filesystem error with the operation and path that triggered it.
    #[error("{context} {}: {source}", path.display())]
    Fs {
        /// What was being attempted.
        context: String,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Directory walk failed.
    #[error("{0}")]
    Walkdir(#[from] walkdir::Error),

    /// Path prefix stripping failed while mirroring a tree.
    #[error("{0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// A pipeline stage failed and the configuration was aborted.
    #[error("[{configuration}] {stage} failed: {reason}")]
    StageFailed {
        /// Configuration being assembled.
        configuration: BuildConfiguration,
        /// Stage that failed.
        stage: Stage,
        /// Operator-facing reason, usually the captured error stream.
        reason: String,
    },

    /// The shared cancellation token was raised.
    #[error("operation was canceled")]
    Cancelled,

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Returns `true` for [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Attaches path context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps the error with `context` and `path`.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Converts options and foreign errors into [`Error::GenericError`] with a message.
pub trait Context<T> {
    /// Uses `msg` as the error message.
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T>;

    /// Lazily builds the error message.
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(msg.to_string()))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

impl<T> Context<T> for Result<T> {
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T> {
        self.map_err(|e| match e {
            Error::Cancelled => Error::Cancelled,
            other => Error::GenericError(format!("{msg}: {other}")),
        })
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| match e {
            Error::Cancelled => Error::Cancelled,
            other => Error::GenericError(format!("{}: {other}", f())),
        })
    }
}

/// Returns early with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
