//! Kodegen Bundler Universal - universal macOS bundles for .NET applications.
//!
//! This binary publishes both macOS architectures, merges them into one
//! `.app`, and signs, packages and notarizes it.

use std::process;

use kodegen_bundler_universal::cli;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
            1
        }
    };

    process::exit(exit_code);
}
