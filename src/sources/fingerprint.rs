//! Staleness tracking for loaded source files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::resolve_selector;

/// Modification times of the files a store was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFingerprint {
    modified: HashMap<PathBuf, SystemTime>,
}

impl SourceFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the modification time observed for `path`.
    pub fn record(&mut self, path: PathBuf, modified: SystemTime) {
        self.modified.insert(path, modified);
    }

    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.modified.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
    }
}

/// Returns true if the files matching `selector` differ from `fingerprint`.
///
/// Any error along the way (bad pattern, failed stat) counts as stale so the
/// caller attempts a reload instead of serving possibly-wrong data forever.
/// Errors are logged here and never returned.
pub fn is_stale(selector: &str, fingerprint: &SourceFingerprint) -> bool {
    let files = match resolve_selector(selector) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(selector = %selector, error = %e, "Cannot resolve selector, treating as stale");
            return true;
        }
    };

    if files.len() != fingerprint.len() {
        tracing::info!(
            selector = %selector,
            matched = files.len(),
            recorded = fingerprint.len(),
            "Source file list changed"
        );
        return true;
    }

    for file in &files {
        let modified = match std::fs::metadata(file).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "Cannot stat source, treating as stale");
                return true;
            }
        };

        // An unrecorded file is older than nothing.
        let stale = match fingerprint.get(file) {
            Some(recorded) => modified > recorded,
            None => true,
        };
        if stale {
            tracing::info!(path = %file.display(), "Source file is stale");
            return true;
        }
    }

    false
}
