//! Scanner module - walks a directory tree and collects video files
//!
//! Two walkers produce the same result. The parallel one goes level by
//! level on a rayon pool: all directories of a level are listed and stat-ed
//! concurrently, and their subdirectories form the next level. The
//! sequential one is a plain walkdir traversal used when the scan is
//! configured for a single thread. Neither recurses on the call stack, so
//! tree depth is bounded only by the filesystem.
//!
//! Entries are stat-ed through symlinks. A directory whose identity already
//! appears among its ancestors is a symlink cycle; it is logged and skipped.
//! Any other read or stat failure aborts the whole scan.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanErrorKind};
use crate::models::VideoEntry;

/// Shared flag a caller can set to stop a running scan
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// (device, inode) of a directory, where the platform exposes one
type DirId = (u64, u64);

/// Scan `root` with the default configuration
pub fn scan(root: &Path) -> Result<Vec<VideoEntry>, ScanError> {
    scan_with(root, &ScanConfig::default(), &CancelToken::new())
}

/// Scan `root` for video files.
///
/// Returns every regular file below `root` whose extension is in
/// `config.extensions`, relative to `root` and sorted. Ignore patterns are
/// not applied here, see [`crate::collect_videos`].
pub fn scan_with(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Vec<VideoEntry>, ScanError> {
    let start = Instant::now();

    let metadata = fs::metadata(root).map_err(|e| ScanError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::invalid_path(
            root.to_path_buf(),
            "Scan root is not a directory",
        ));
    }

    let mut entries = if config.is_sequential() {
        walk_sequential(root, config, cancel)?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.effective_threads())
            .thread_name(|i| format!("scan-{}", i))
            .build()
            .map_err(|e| {
                ScanError::new(ScanErrorKind::IoError, Some(root.to_path_buf()), e.to_string())
            })?;
        pool.install(|| walk_parallel(root, dir_id(&metadata), config, cancel))?
    };

    entries.sort();

    log::debug!(
        "Scanned {:?}: {} videos in {}ms",
        root,
        entries.len(),
        start.elapsed().as_millis()
    );

    Ok(entries)
}

/// A directory waiting to be listed, with the identities of the
/// directories above it
struct PendingDir {
    path: PathBuf,
    ancestors: Vec<DirId>,
}

/// What one directory entry turned out to be
enum Visited {
    Video(VideoEntry),
    Dir(PendingDir),
    Skipped,
}

/// Breadth-first walk: every directory of one level is listed in parallel,
/// and the subdirectories found become the next level. Stack use does not
/// grow with tree depth.
fn walk_parallel(
    root: &Path,
    root_id: Option<DirId>,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Vec<VideoEntry>, ScanError> {
    let mut entries = Vec::new();
    let mut frontier = vec![PendingDir {
        path: root.to_path_buf(),
        ancestors: root_id.into_iter().collect(),
    }];

    while !frontier.is_empty() {
        let levels = frontier
            .par_iter()
            .map(|dir| list_dir(root, dir, config, cancel))
            .collect::<Result<Vec<_>, _>>()?;

        frontier = Vec::new();
        for visited in levels.into_iter().flatten() {
            match visited {
                Visited::Video(entry) => entries.push(entry),
                Visited::Dir(dir) => frontier.push(dir),
                Visited::Skipped => {}
            }
        }
    }

    Ok(entries)
}

fn list_dir(
    root: &Path,
    dir: &PendingDir,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Vec<Visited>, ScanError> {
    if cancel.is_cancelled() {
        return Err(ScanError::cancelled(Some(dir.path.clone())));
    }

    let children = fs::read_dir(&dir.path)
        .map_err(|e| ScanError::io(&dir.path, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| ScanError::io(&dir.path, e)))
        .collect::<Result<Vec<PathBuf>, _>>()?;

    children
        .into_par_iter()
        .map(|path| visit(root, path, &dir.ancestors, config))
        .collect()
}

fn visit(
    root: &Path,
    path: PathBuf,
    ancestors: &[DirId],
    config: &ScanConfig,
) -> Result<Visited, ScanError> {
    let metadata = fs::metadata(&path).map_err(|e| ScanError::io(&path, e))?;

    if metadata.is_dir() {
        let mut chain = ancestors.to_vec();
        if let Some(id) = dir_id(&metadata) {
            if ancestors.contains(&id) {
                log::warn!("Skipping symlink cycle at {:?}", path);
                return Ok(Visited::Skipped);
            }
            chain.push(id);
        }
        return Ok(Visited::Dir(PendingDir {
            path,
            ancestors: chain,
        }));
    }

    if metadata.is_file() && config.extensions.matches(&path) {
        if let Some(entry) = relative_entry(root, &path) {
            return Ok(Visited::Video(entry));
        }
    }

    Ok(Visited::Skipped)
}

fn walk_sequential(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Vec<VideoEntry>, ScanError> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(ScanError::cancelled(Some(root.to_path_buf())));
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                log::warn!("Skipping symlink cycle at {:?}", e.path());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if entry.file_type().is_file() && config.extensions.matches(entry.path()) {
            entries.extend(relative_entry(root, entry.path()));
        }
    }

    Ok(entries)
}

fn relative_entry(root: &Path, path: &Path) -> Option<VideoEntry> {
    let relative = path.strip_prefix(root).ok()?;
    let entry = VideoEntry::from_relative_path(relative);
    if entry.is_none() {
        log::warn!("Skipping non UTF-8 path {:?}", path);
    }
    entry
}

#[cfg(unix)]
fn dir_id(metadata: &fs::Metadata) -> Option<DirId> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn dir_id(_metadata: &fs::Metadata) -> Option<DirId> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtensionSet;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    fn sample_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "movie.MKV");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "sub/clip.mp4");
        dir
    }

    fn paths(entries: &[VideoEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.as_str()).collect()
    }

    fn sequential() -> ScanConfig {
        ScanConfig::builder().num_threads(1).build()
    }

    #[test]
    fn test_scan_finds_videos_case_insensitive() {
        let dir = sample_tree();
        let entries = scan(dir.path()).unwrap();

        let found: HashSet<&str> = paths(&entries).into_iter().collect();
        let expected: HashSet<&str> = ["movie.MKV", "sub/clip.mp4"].into_iter().collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_scan_output_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["z.mp4", "a/b/c.avi", "m.wmv", "a/a.mov", "b/x.mkv"] {
            touch(dir.path(), rel);
        }
        let entries = scan(dir.path()).unwrap();
        assert_eq!(
            paths(&entries),
            vec!["a/a.mov", "a/b/c.avi", "b/x.mkv", "m.wmv", "z.mp4"]
        );
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let dir = tempfile::tempdir().unwrap();
        for rel in [
            "one.mp4",
            "deep/er/and/deeper/two.MOV",
            "deep/notes.md",
            "wide/1.mkv",
            "wide/2.mkv",
            "wide/3.txt",
            "empty-dir/.keep",
        ] {
            touch(dir.path(), rel);
        }

        let parallel = scan_with(
            dir.path(),
            &ScanConfig::builder().num_threads(4).build(),
            &CancelToken::new(),
        )
        .unwrap();
        let seq = scan_with(dir.path(), &sequential(), &CancelToken::new()).unwrap();

        assert_eq!(parallel, seq);
        assert_eq!(parallel.len(), 4);
    }

    #[test]
    fn test_deep_tree_does_not_exhaust_stack() {
        let dir = tempfile::tempdir().unwrap();
        let nested = "a/".repeat(1500);
        touch(dir.path(), &format!("{}deep.mp4", nested));
        touch(dir.path(), "top.mkv");

        let config = ScanConfig::builder().num_threads(2).build();
        let parallel = scan_with(dir.path(), &config, &CancelToken::new()).unwrap();
        assert_eq!(
            paths(&parallel),
            vec![format!("{}deep.mp4", nested).as_str(), "top.mkv"]
        );

        let seq = scan_with(dir.path(), &sequential(), &CancelToken::new()).unwrap();
        assert_eq!(seq, parallel);
    }

    #[test]
    fn test_directories_named_like_videos_are_not_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.mp4")).unwrap();
        touch(dir.path(), "folder.mp4/inner.avi");

        let entries = scan(dir.path()).unwrap();
        assert_eq!(paths(&entries), vec!["folder.mp4/inner.avi"]);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = sample_tree();
        touch(dir.path(), "clip.webm");
        let config = ScanConfig::builder()
            .extensions(ExtensionSet::new(["webm", "txt"]))
            .build();

        let entries = scan_with(dir.path(), &config, &CancelToken::new()).unwrap();
        assert_eq!(paths(&entries), vec!["clip.webm", "readme.txt"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = scan(&missing).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);
        assert_eq!(err.path, Some(missing.clone()));

        let err = scan_with(&missing, &sequential(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);
    }

    #[test]
    fn test_file_root_fails() {
        let dir = sample_tree();
        let err = scan(&dir.path().join("movie.MKV")).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidPath);
    }

    #[test]
    fn test_cancelled_scan_fails() {
        let dir = sample_tree();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = scan_with(dir.path(), &ScanConfig::default(), &cancel).unwrap_err();
        assert!(err.is_cancelled());

        let err = scan_with(dir.path(), &sequential(), &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_video_is_included() {
        let dir = sample_tree();
        std::os::unix::fs::symlink(dir.path().join("movie.MKV"), dir.path().join("alias.mp4"))
            .unwrap();

        let entries = scan(dir.path()).unwrap();
        assert_eq!(paths(&entries), vec!["alias.mp4", "movie.MKV", "sub/clip.mp4"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let dir = sample_tree();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/back")).unwrap();

        let parallel = scan(dir.path()).unwrap();
        assert_eq!(paths(&parallel), vec!["movie.MKV", "sub/clip.mp4"]);

        let seq = scan_with(dir.path(), &sequential(), &CancelToken::new()).unwrap();
        assert_eq!(seq, parallel);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_aborts_scan() {
        let dir = sample_tree();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("sub/broken.mp4"))
            .unwrap();

        let err = scan(dir.path()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);

        let err = scan_with(dir.path(), &sequential(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);
    }
}
