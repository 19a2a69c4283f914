//! Deduplication engine against real directories.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use common::is_symlink;
use kodegen_bundler_universal::bundler::{
    EventSink, LogEvent, RecordingSink, Reporter, deduplicate, utils::fs::staging_link_path,
};
use tokio_util::sync::CancellationToken;

/// Raises the token when the first pair has been linked.
struct CancelAfterFirstLink(CancellationToken);

impl EventSink for CancelAfterFirstLink {
    fn emit(&self, event: LogEvent) {
        if event.message.starts_with("Linked:") {
            self.0.cancel();
        }
    }
}

fn reporter() -> Reporter {
    Reporter::new(Arc::new(RecordingSink::new()))
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, content).expect("write");
}

#[tokio::test]
async fn test_name_collision_in_shared_gets_suffix() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("osx-x64");
    let b = root.path().join("osx-arm64");
    let shared = root.path().join("shared");
    write(&a.join("libSystem.Native.dylib"), "native");
    write(&b.join("libSystem.Native.dylib"), "native");
    write(&shared.join("libSystem.Native.dylib"), "older content");

    let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
        .await
        .expect("dedup");

    assert_eq!(report.links.len(), 1);
    let target = shared.join("libSystem.Native_1.dylib");
    assert_eq!(report.links[0].shared_target, target);
    assert_eq!(std::fs::read_to_string(&target).expect("read"), "native");
    assert_eq!(
        std::fs::read_to_string(shared.join("libSystem.Native.dylib")).expect("read"),
        "older content"
    );
    assert_eq!(
        std::fs::read_link(a.join("libSystem.Native.dylib")).expect("link"),
        Path::new("../shared/libSystem.Native_1.dylib")
    );
}

#[tokio::test]
async fn test_differing_content_is_untouched() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    write(&a.join("App"), "x86_64");
    write(&b.join("App"), "arm64");

    let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
        .await
        .expect("dedup");

    assert!(report.links.is_empty());
    assert_eq!(std::fs::read_to_string(a.join("App")).expect("read"), "x86_64");
    assert_eq!(std::fs::read_to_string(b.join("App")).expect("read"), "arm64");
}

#[tokio::test]
async fn test_match_under_a_different_name() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    write(&a.join("icon-x64.png"), "pixels");
    write(&b.join("icon-arm64.png"), "pixels");

    let report = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter())
        .await
        .expect("dedup");

    assert_eq!(report.links.len(), 1);
    // Shared name comes from the first directory.
    assert!(shared.join("icon-x64.png").is_file());
    assert!(is_symlink(&a.join("icon-x64.png")));
    assert!(is_symlink(&b.join("icon-arm64.png")));
    assert_eq!(
        std::fs::read_to_string(b.join("icon-arm64.png")).expect("read"),
        "pixels"
    );
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_changes() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    write(&a.join("same.dll"), "bytes");
    write(&b.join("same.dll"), "bytes");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = deduplicate(&a, &b, &shared, &cancel, &reporter())
        .await
        .expect("cancellation is not an error");

    assert!(report.cancelled);
    assert!(report.links.is_empty());
    assert!(!shared.exists());
    assert!(!is_symlink(&a.join("same.dll")));
    assert!(!is_symlink(&b.join("same.dll")));
}

#[tokio::test]
async fn test_cancellation_between_files_stops_after_current_pair() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    for name in ["one.dll", "two.dll", "three.dll"] {
        write(&a.join(name), name);
        write(&b.join(name), name);
    }
    let cancel = CancellationToken::new();
    let reporter = Reporter::new(Arc::new(CancelAfterFirstLink(cancel.clone())));

    let report = deduplicate(&a, &b, &shared, &cancel, &reporter)
        .await
        .expect("cancellation is not an error");

    assert!(report.cancelled);
    assert_eq!(report.links.len(), 1);
    // Lexicographic order: "one.dll" is merged first.
    assert!(is_symlink(&a.join("one.dll")));
    assert!(is_symlink(&b.join("one.dll")));
    for name in ["three.dll", "two.dll"] {
        assert!(!is_symlink(&a.join(name)), "{name} in a was linked");
        assert!(!is_symlink(&b.join(name)), "{name} in b was linked");
    }
    assert_eq!(std::fs::read_dir(&shared).expect("read").count(), 1);
}

#[tokio::test]
async fn test_failed_link_in_second_directory_keeps_both_files() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    write(&a.join("App.dll"), "il");
    write(&b.join("App.dll"), "il");
    std::fs::create_dir(staging_link_path(&b.join("App.dll"))).expect("occupy");

    let result = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter()).await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(a.join("App.dll")).expect("read a"), "il");
    assert_eq!(std::fs::read_to_string(b.join("App.dll")).expect("read b"), "il");
    assert!(!is_symlink(&b.join("App.dll")));
}

#[tokio::test]
async fn test_failed_link_in_first_directory_leaves_no_shared_copy() {
    let root = tempfile::tempdir().expect("tempdir");
    let a = root.path().join("a");
    let b = root.path().join("b");
    let shared = root.path().join("shared");
    write(&a.join("App.dll"), "il");
    write(&b.join("App.dll"), "il");
    std::fs::create_dir(staging_link_path(&a.join("App.dll"))).expect("occupy");

    let result = deduplicate(&a, &b, &shared, &CancellationToken::new(), &reporter()).await;

    assert!(result.is_err());
    assert!(!is_symlink(&a.join("App.dll")));
    assert!(!is_symlink(&b.join("App.dll")));
    assert_eq!(std::fs::read_to_string(a.join("App.dll")).expect("read a"), "il");
    assert_eq!(std::fs::read_dir(&shared).expect("read").count(), 0);
}
