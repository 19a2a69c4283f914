//! Error types for the command line surface.
//!
//! Pipeline failures are not errors here: they end up in a
//! [`RunOutcome`](crate::bundler::RunOutcome) and map to an exit code. These
//! types cover what stops the run before the pipeline starts.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bundler errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Required external tools are not on `PATH`
    #[error("Required tools not found in PATH: {}", tools.join(", "))]
    MissingTools {
        /// Tools that could not be resolved
        tools: Vec<String>,
    },

    /// A configured identity is not in the keychain
    #[error("Signing identity '{identity}' not found in keychain")]
    MissingIdentity {
        /// Identity that was looked up
        identity: String,
    },
}

impl BundlerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BundlerError::Cli(CliError::MissingTools { .. }) => vec![
                "Install the .NET SDK and the Xcode command line tools".to_string(),
                "Or pass --dry-run to preview the commands".to_string(),
            ],
            BundlerError::Cli(CliError::MissingIdentity { .. }) => vec![
                "List available identities with: security find-identity -v -p codesigning"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
