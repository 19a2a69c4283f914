//! Content hashing.
//!
//! SHA-256 is the source of truth for "identical content" during
//! deduplication, and the checksum recorded for finished disk images.

use crate::bundler::{Result, error::ErrorExt};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// SHA-256 digest of one regular file. Used as a map key only.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FileHash([u8; 32]);

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Calculates the SHA-256 of a single file.
///
/// Reads the file in 8KB chunks so large runtime libraries never need to fit
/// in memory. Once started, the read always runs to completion.
pub async fn hash_file(file_path: &Path) -> Result<FileHash> {
    let mut file = tokio::fs::File::open(file_path)
        .await
        .fs_context("opening file for hashing", file_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", file_path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(FileHash(hasher.finalize().into()))
}
