//! File system utilities for bundling.
//!
//! Provides idempotent directory operations, cancellable tree copies,
//! symlink preservation, and relative link computation.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file_sync(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file_sync(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir_sync(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir_sync(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Creates `link` pointing at `target` (stored verbatim, may be relative).
pub async fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    let target = target.to_path_buf();
    let link_path = link.to_path_buf();
    tokio::task::spawn_blocking(move || symlink_file_sync(&target, &link_path))
        .await
        .map_err(|e| Error::GenericError(format!("Symlink task panicked: {}", e)))?
        .fs_context("creating symbolic link", link)
}

/// Name of the staging link used by [`replace_with_symlink`] for `path`.
pub fn staging_link_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.link-tmp"))
}

/// Atomically replaces `path` with a link to `target`.
///
/// The link is created under a staging name in the same directory and
/// renamed over `path`, so `path` is either the old file or the new link,
/// never missing.
pub async fn replace_with_symlink(target: &Path, path: &Path) -> Result<()> {
    let staging = staging_link_path(path);
    symlink_file(target, &staging).await?;
    if let Err(e) = fs::rename(&staging, path).await {
        if let Err(cleanup) = remove_file_if_exists(&staging).await {
            log::debug!("Failed to remove staging link: {}", cleanup);
        }
        return Err(e).fs_context("replacing with symbolic link", path);
    }
    Ok(())
}

/// Removes a file or symlink if present. Never follows the link.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Marks a file as executable (`0755`).
#[cfg(unix)]
pub async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("setting executable permissions", path)
}

/// Marks a file as executable. No-op where permission bits do not exist.
#[cfg(not(unix))]
pub async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file to", to)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them. Existing destination
/// directories are merged into. The copy stops with [`Error::Cancelled`] at the
/// next entry once `cancel` fires.
pub async fn copy_dir(from: &Path, to: &Path, cancel: &CancellationToken) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a Directory")));
    }

    // Clone paths for move into blocking closure
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let cancel = cancel.clone();

    // Offload blocking work to dedicated thread pool
    tokio::task::spawn_blocking(move || -> Result<()> {
        std::fs::create_dir_all(&to).fs_context("creating directory", &to)?;

        for entry in walkdir::WalkDir::new(&from) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let entry = entry?;
            debug_assert!(entry.path().starts_with(&from));
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("reading symbolic link", entry.path())?;
                let linked = if entry.path().is_dir() {
                    symlink_dir_sync(&target, &dest_path)
                } else {
                    symlink_file_sync(&target, &dest_path)
                };
                linked.fs_context("creating symbolic link", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path)
                    .fs_context("copying file to", &dest_path)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

/// Computes the path of `target` relative to the directory `from_dir`.
///
/// Both inputs must be absolute and lexically normalized (no `..`). The
/// result never starts with `/`, so links built from it survive moving the
/// whole tree.
///
/// ```
/// use kodegen_bundler_universal::bundler::utils::fs::relative_path;
/// use std::path::Path;
///
/// let rel = relative_path(
///     Path::new("/b/Contents/MacOS/osx-x64"),
///     Path::new("/b/Contents/MacOS/shared/libfoo.dylib"),
/// );
/// assert_eq!(rel, Path::new("../shared/libfoo.dylib"));
/// ```
pub fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = target.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}
