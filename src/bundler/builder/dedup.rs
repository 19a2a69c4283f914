//! Cross-architecture file deduplication.
//!
//! Self-contained builds for two architectures carry the same managed
//! assemblies, resources and runtime data. Files whose SHA-256 matches
//! across the two top-level directories are moved into a shared pool once
//! and replaced in both places by relative symbolic links, which roughly
//! halves the bundle size.
//!
//! Only top-level regular files are considered. Subdirectories and existing
//! symlinks are never touched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use tokio_util::sync::CancellationToken;

use super::checksum::{FileHash, hash_file};
use crate::bundler::{
    Reporter, Result,
    error::ErrorExt,
    utils::fs,
};

/// One merged pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateLink {
    /// Former file in the first directory, now a link.
    pub original_a: PathBuf,
    /// Former file in the second directory, now a link.
    pub original_b: PathBuf,
    /// Real file in the shared directory.
    pub shared_target: PathBuf,
}

/// What one deduplication pass did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DedupReport {
    pub links: Vec<DuplicateLink>,
    /// The scan stopped early because the run was cancelled.
    pub cancelled: bool,
}

/// Canonical copy for one hash from the first directory.
struct Candidate {
    source: PathBuf,
    /// Set once the source has been moved into the shared pool.
    shared: Option<PathBuf>,
}

/// Merges identical top-level files of `dir_a` and `dir_b` into `shared_dir`.
///
/// When `dir_a` holds several files with identical content, the first one in
/// lexicographic order is the canonical source. A second `dir_b` match for an
/// already merged hash reuses the existing shared file.
///
/// Cancellation is checked between files; a pair that has started merging is
/// always finished. Every original is replaced by its link atomically, so an
/// error midway never leaves a file missing. A cancelled scan returns `Ok`
/// with [`DedupReport::cancelled`] set.
pub async fn deduplicate(
    dir_a: &Path,
    dir_b: &Path,
    shared_dir: &Path,
    cancel: &CancellationToken,
    reporter: &Reporter,
) -> Result<DedupReport> {
    let dir_a = absolute(dir_a)?;
    let dir_b = absolute(dir_b)?;
    let shared_dir = absolute(shared_dir)?;

    let mut report = DedupReport::default();
    if cancel.is_cancelled() {
        report.cancelled = true;
        return Ok(report);
    }

    fs::create_dir_all(&shared_dir, false).await?;

    let files_a = top_level_files(&dir_a).await?;
    let files_b = top_level_files(&dir_b).await?;

    reporter.info(format!("Indexing files in {}...", dir_a.display()));

    let mut index: HashMap<FileHash, Candidate> = HashMap::with_capacity(files_a.len());
    for file in files_a {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }
        let hash = hash_file(&file).await?;
        index.entry(hash).or_insert(Candidate {
            source: file,
            shared: None,
        });
    }

    reporter.info(format!("Comparing with files in {}...", dir_b.display()));

    for file_b in files_b {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let hash = hash_file(&file_b).await?;
        let Some(candidate) = index.get_mut(&hash) else {
            continue;
        };

        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        // Each original is swapped for its link in one rename, so a failure
        // leaves either the file or a working link behind.
        let shared_target = match &candidate.shared {
            Some(existing) => existing.clone(),
            None => {
                let target = unique_target(&shared_dir, &candidate.source).await?;
                tokio::fs::copy(&candidate.source, &target)
                    .await
                    .fs_context("copying shared file to", &target)?;
                if let Err(e) = link_to_shared(&candidate.source, &target).await {
                    if let Err(cleanup) = fs::remove_file_if_exists(&target).await {
                        log::debug!("Failed to remove unused shared copy: {}", cleanup);
                    }
                    return Err(e);
                }
                candidate.shared = Some(target.clone());
                target
            }
        };

        link_to_shared(&file_b, &shared_target).await?;

        reporter.info(format!(
            "Linked: {} and {} -> {}",
            candidate.source.display(),
            file_b.display(),
            shared_target.display()
        ));

        report.links.push(DuplicateLink {
            original_a: candidate.source.clone(),
            original_b: file_b,
            shared_target,
        });
    }

    Ok(report)
}

/// Regular files directly inside `dir`, sorted by path.
async fn top_level_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading directory", dir)?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading directory entry in", dir)?
    {
        // file_type() does not follow symlinks
        let file_type = entry
            .file_type()
            .await
            .fs_context("reading file type of", entry.path())?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// First free name for `source`'s file name in `shared_dir`: `name.ext`,
/// then `name_1.ext`, `name_2.ext`, ...
async fn unique_target(shared_dir: &Path, source: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut target = shared_dir.join(&file_name);
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut count = 1u32;
    while tokio::fs::symlink_metadata(&target).await.is_ok() {
        target = shared_dir.join(format!("{stem}_{count}{extension}"));
        count += 1;
    }

    Ok(target)
}

/// Replaces `original` with a link to `shared_target`, relative to the
/// original's directory.
async fn link_to_shared(original: &Path, shared_target: &Path) -> Result<()> {
    let parent = original.parent().unwrap_or_else(|| Path::new("/"));
    let relative = fs::relative_path(parent, shared_target);
    fs::replace_with_symlink(&relative, original).await
}

fn absolute(path: &Path) -> Result<PathBuf> {
    path.absolutize()
        .map(|p| p.into_owned())
        .fs_context("resolving absolute path", path)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::RecordingSink;
    use std::sync::Arc;

    fn reporter() -> Reporter {
        Reporter::new(Arc::new(RecordingSink::new()))
    }

    #[tokio::test]
    async fn test_unique_target_suffixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = dir.path();
        std::fs::write(shared.join("lib.dll"), "1").expect("write");
        std::fs::write(shared.join("lib_1.dll"), "2").expect("write");

        let target = unique_target(shared, Path::new("/x/lib.dll"))
            .await
            .expect("target");
        assert_eq!(target, shared.join("lib_2.dll"));

        let target = unique_target(shared, Path::new("/x/other.dll"))
            .await
            .expect("target");
        assert_eq!(target, shared.join("other.dll"));
    }

    #[tokio::test]
    async fn test_first_lexicographic_duplicate_in_a_wins() {
        let root = tempfile::tempdir().expect("tempdir");
        let a = root.path().join("a");
        let b = root.path().join("b");
        let shared = root.path().join("shared");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::create_dir_all(&b).expect("mkdir");
        std::fs::write(a.join("alpha.bin"), "same").expect("write");
        std::fs::write(a.join("zeta.bin"), "same").expect("write");
        std::fs::write(b.join("copy.bin"), "same").expect("write");

        let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
            .await
            .expect("dedup");

        assert_eq!(report.links.len(), 1);
        assert_eq!(report.links[0].original_a, a.join("alpha.bin"));
        assert_eq!(report.links[0].shared_target, shared.join("alpha.bin"));
        assert!(a.join("zeta.bin").symlink_metadata().expect("meta").is_file());
    }

    #[tokio::test]
    async fn test_second_match_reuses_shared_copy() {
        let root = tempfile::tempdir().expect("tempdir");
        let a = root.path().join("a");
        let b = root.path().join("b");
        let shared = root.path().join("shared");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::create_dir_all(&b).expect("mkdir");
        std::fs::write(a.join("runtime.dat"), "payload").expect("write");
        std::fs::write(b.join("runtime.dat"), "payload").expect("write");
        std::fs::write(b.join("runtime-copy.dat"), "payload").expect("write");

        let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
            .await
            .expect("dedup");

        assert_eq!(report.links.len(), 2);
        assert_eq!(std::fs::read_dir(&shared).expect("read").count(), 1);
        for name in ["runtime.dat", "runtime-copy.dat"] {
            let link = b.join(name);
            assert!(link.symlink_metadata().expect("meta").file_type().is_symlink());
            assert_eq!(std::fs::read_to_string(&link).expect("read"), "payload");
        }
    }

    #[tokio::test]
    async fn test_existing_symlinks_are_skipped() {
        let root = tempfile::tempdir().expect("tempdir");
        let a = root.path().join("a");
        let b = root.path().join("b");
        let shared = root.path().join("shared");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::create_dir_all(&b).expect("mkdir");
        std::fs::write(root.path().join("real.txt"), "x").expect("write");
        std::os::unix::fs::symlink(root.path().join("real.txt"), a.join("l.txt")).expect("link");
        std::os::unix::fs::symlink(root.path().join("real.txt"), b.join("l.txt")).expect("link");

        let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
            .await
            .expect("dedup");

        assert!(report.links.is_empty());
        assert_eq!(std::fs::read_dir(&shared).expect("read").count(), 0);
    }
}
