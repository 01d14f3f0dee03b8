//! Source directory watcher for push-style reload.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::server::ConfigServer;
use crate::sources::selector_root;

/// Watches the directories holding the server's sources and reloads stale
/// stores when anything in them changes.
pub struct SourceWatcher {
    roots: BTreeMap<PathBuf, RecursiveMode>,
    server: Arc<ConfigServer>,
}

impl SourceWatcher {
    /// Create a watcher for the selectors currently installed on `server`.
    pub fn new(server: Arc<ConfigServer>) -> Self {
        let mut roots = BTreeMap::new();
        for selector in server.selectors() {
            let mut root = selector_root(&selector);
            if root.as_os_str().is_empty() {
                root = PathBuf::from(".");
            }
            let mode = if selector.contains("**") {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            // Recursive wins if two selectors share a root.
            roots
                .entry(root)
                .and_modify(|m| {
                    if mode == RecursiveMode::Recursive {
                        *m = mode;
                    }
                })
                .or_insert(mode);
        }
        Self { roots, server }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let server = self.server.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "Source change detected");
                        server.reload_stale();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for (root, mode) in &self.roots {
            watcher.watch(root, *mode)?;
            tracing::info!(path = ?root, "Source watcher started");
        }
        Ok(watcher)
    }
}
