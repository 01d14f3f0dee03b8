//! On-disk configuration sources.
//!
//! # Data Flow
//! ```text
//! selector pattern (glob)
//!     → resolve_selector (ordered file list)
//!     → read_sources (stat + read each file)
//!     → store parses contents (catalog / templates)
//!     → SourceFingerprint recorded alongside the snapshot
//!
//! On each freshness check:
//!     fingerprint::is_stale re-resolves the selector
//!     → compares file count and modification times
//! ```
//!
//! # Design Decisions
//! - Match order is the lexicographic order the glob walker yields
//! - Files are stat'ed before they are read, so a write racing the load
//!   shows up as stale on the next check rather than being missed
//! - Unreadable directories met while walking are skipped, not fatal

pub mod fingerprint;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::LoadError;

pub use fingerprint::{is_stale, SourceFingerprint};
pub use watcher::SourceWatcher;

/// A store whose snapshot is built from the files a selector matches.
pub trait SourceStore: Sized + Send + Sync + 'static {
    /// Store name used in logs and metrics.
    const KIND: &'static str;

    /// Load a complete new snapshot, or fail without partial results.
    fn load(selector: &str) -> Result<(Self, SourceFingerprint), LoadError>;
}

/// One matched source file, read at load time.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub contents: String,
}

/// Resolve a selector pattern to the files it currently matches.
pub fn resolve_selector(selector: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = glob::glob(selector).map_err(|e| LoadError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => files.push(std::path::absolute(&path).unwrap_or(path)),
            Err(e) => {
                tracing::debug!(selector = %selector, error = %e, "Skipping unreadable glob entry");
            }
        }
    }
    Ok(files)
}

/// Resolve `selector` and read every matched file.
///
/// Fails with [`LoadError::NoFilesMatched`] when nothing matches; any single
/// unreadable file fails the whole batch.
pub fn read_sources(selector: &str) -> Result<(Vec<SourceFile>, SourceFingerprint), LoadError> {
    let paths = resolve_selector(selector)?;
    if paths.is_empty() {
        return Err(LoadError::NoFilesMatched {
            selector: selector.to_string(),
        });
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut fingerprint = SourceFingerprint::new();
    for path in paths {
        let modified = modified_time(&path)?;
        let contents = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        fingerprint.record(path.clone(), modified);
        files.push(SourceFile {
            path,
            modified,
            contents,
        });
    }

    Ok((files, fingerprint))
}

fn modified_time(path: &Path) -> Result<SystemTime, LoadError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// The directory a selector's matches live under: everything before the
/// first path component containing a glob metacharacter.
pub fn selector_root(selector: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(selector).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[']) {
            return root;
        }
        root.push(component);
    }
    // A literal file path: watch the directory holding it.
    root.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sources_in_match_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();

        let selector = format!("{}/*.json", dir.path().display());
        let (files, fingerprint) = read_sources(&selector).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(fingerprint.len(), 2);
        assert!(files.iter().all(|f| f.path.is_absolute()));
    }

    #[test]
    fn test_no_files_matched() {
        let dir = tempfile::tempdir().unwrap();
        let selector = format!("{}/*.json", dir.path().display());

        match read_sources(&selector) {
            Err(LoadError::NoFilesMatched { selector: s }) => assert_eq!(s, selector),
            other => panic!("expected NoFilesMatched, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            resolve_selector("templates/[*.tpl"),
            Err(LoadError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_selector_root() {
        assert_eq!(selector_root("templates/*.tpl.*"), PathBuf::from("templates"));
        assert_eq!(selector_root("/srv/vanity/projects.json"), PathBuf::from("/srv/vanity"));
        assert_eq!(selector_root("projects.json"), PathBuf::new());
        assert_eq!(selector_root("conf/*/projects.json"), PathBuf::from("conf"));
    }
}
