//! The reloadable-configuration server.
//!
//! # Data Flow
//! ```text
//! request (sub-path, go-get flag)
//!     → CheckFreshness (if reload-on-demand): templates and projects
//!       checked and reloaded independently
//!     → load the current Snapshot (one atomic read)
//!     → PageContext::derive (listing / redirect / generic)
//!     → render root template
//!     → Page (body, optional Refresh header)
//! ```
//!
//! # Design Decisions
//! - Templates and catalog live in ONE snapshot value behind an `ArcSwap`;
//!   a reload builds the new store off to the side and publishes a complete
//!   snapshot with a single pointer swap
//! - A failed reload is logged and leaves the installed snapshot untouched
//! - Concurrent reloads are not deduplicated; the last install wins
//! - The root template is always executed, even for unknown sub-paths

pub mod context;

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use crate::catalog::ProjectCatalog;
use crate::config::{RenderConfig, SourcesConfig};
use crate::error::{LoadError, RenderError};
use crate::observability::metrics;
use crate::sources::{is_stale, SourceFingerprint, SourceStore};
use crate::templates::TemplateSet;

pub use context::{Action, PageContext};

/// A store's value together with where and when it was loaded from.
#[derive(Debug)]
pub struct Loaded<T> {
    pub selector: String,
    pub value: T,
    pub fingerprint: SourceFingerprint,
}

impl<T: SourceStore> Loaded<T> {
    /// Load `T` from `selector`.
    pub fn load(selector: &str) -> Result<Self, LoadError> {
        let (value, fingerprint) = T::load(selector)?;
        Ok(Self {
            selector: selector.to_string(),
            value,
            fingerprint,
        })
    }

    /// Whether the sources behind this value changed since it was loaded.
    pub fn is_stale(&self) -> bool {
        is_stale(&self.selector, &self.fingerprint)
    }
}

/// Everything a request renders from, published as one unit.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub templates: Arc<Loaded<TemplateSet>>,
    pub projects: Arc<Loaded<ProjectCatalog>>,
}

/// What happened to one store during a reload pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreReload {
    /// Sources unchanged; nothing loaded.
    Fresh,
    /// A new snapshot was installed.
    Reloaded,
    /// Loading failed; the previous snapshot stays installed.
    Failed,
}

/// Outcome of [`ConfigServer::reload_stale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    pub templates: StoreReload,
    pub projects: StoreReload,
}

/// A rendered page ready to be written to the client.
#[derive(Debug)]
pub struct Page {
    /// Bytes produced by the template, possibly truncated by `error`.
    pub body: Vec<u8>,
    /// Delayed-redirect header value, when the path matched a project.
    pub refresh: Option<String>,
    pub action: Option<Action>,
    pub error: Option<RenderError>,
}

/// Serves vanity pages from a hot-reloadable snapshot of templates and
/// projects.
pub struct ConfigServer {
    snapshot: ArcSwap<Snapshot>,
    render: RenderConfig,
    reload_on_demand: bool,
}

impl ConfigServer {
    /// Perform the initial load of both stores.
    ///
    /// Unlike later reloads, failure here is returned to the caller: there
    /// is no previous snapshot to fall back to.
    pub fn load(
        sources: &SourcesConfig,
        render: RenderConfig,
        reload_on_demand: bool,
    ) -> Result<Self, LoadError> {
        let templates = Arc::new(Loaded::<TemplateSet>::load(&sources.templates)?);
        let projects = Arc::new(Loaded::<ProjectCatalog>::load(&sources.projects)?);

        tracing::info!(
            templates = templates.value.names().len(),
            projects = projects.value.len(),
            visible = projects.value.visible().count(),
            "Initial sources loaded"
        );

        Ok(Self::new(
            Snapshot {
                templates,
                projects,
            },
            render,
            reload_on_demand,
        ))
    }

    pub fn new(snapshot: Snapshot, render: RenderConfig, reload_on_demand: bool) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            render,
            reload_on_demand,
        }
    }

    /// The currently installed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    pub fn reload_on_demand(&self) -> bool {
        self.reload_on_demand
    }

    /// Selector patterns of the installed stores.
    pub fn selectors(&self) -> Vec<String> {
        let snapshot = self.snapshot.load();
        vec![
            snapshot.templates.selector.clone(),
            snapshot.projects.selector.clone(),
        ]
    }

    /// Load templates from `selector` and install them.
    ///
    /// On success the selector is remembered for later freshness checks.
    pub fn load_templates(&self, selector: &str) -> Result<(), LoadError> {
        let templates = Arc::new(load_store::<TemplateSet>(selector)?);
        self.snapshot.rcu(|current| Snapshot {
            templates: templates.clone(),
            projects: current.projects.clone(),
        });
        Ok(())
    }

    /// Load projects from `selector` and install them.
    pub fn load_projects(&self, selector: &str) -> Result<(), LoadError> {
        let projects = Arc::new(load_store::<ProjectCatalog>(selector)?);
        self.snapshot.rcu(|current| Snapshot {
            templates: current.templates.clone(),
            projects: projects.clone(),
        });
        Ok(())
    }

    /// Reload whichever stores have stale sources.
    ///
    /// Each store is checked and reloaded on its own; a failure in one does
    /// not stop the other. Failures are logged, never returned.
    pub fn reload_stale(&self) -> ReloadReport {
        let current = self.snapshot.load_full();

        let templates = if current.templates.is_stale() {
            self.reload_with(&current.templates.selector, Self::load_templates)
        } else {
            StoreReload::Fresh
        };
        let projects = if current.projects.is_stale() {
            self.reload_with(&current.projects.selector, Self::load_projects)
        } else {
            StoreReload::Fresh
        };

        ReloadReport {
            templates,
            projects,
        }
    }

    /// Reload both stores regardless of freshness.
    pub fn force_reload(&self) -> ReloadReport {
        let current = self.snapshot.load_full();
        ReloadReport {
            templates: self.reload_with(&current.templates.selector, Self::load_templates),
            projects: self.reload_with(&current.projects.selector, Self::load_projects),
        }
    }

    fn reload_with(
        &self,
        selector: &str,
        load: fn(&Self, &str) -> Result<(), LoadError>,
    ) -> StoreReload {
        match load(self, selector) {
            Ok(()) => StoreReload::Reloaded,
            Err(e) => {
                tracing::error!(
                    selector = %selector,
                    path = ?e.path(),
                    error = %e,
                    "Reload failed, keeping previous snapshot"
                );
                StoreReload::Failed
            }
        }
    }

    /// Handle one request for `sub_path`.
    ///
    /// Always produces a page: reload failures fall back to the installed
    /// snapshot and render failures keep whatever output was produced.
    pub fn respond(&self, sub_path: &str, go_get: bool) -> Page {
        if self.reload_on_demand {
            self.reload_stale();
        }
        self.render(sub_path, go_get)
    }

    /// Render `sub_path` against the installed snapshot, without reloading.
    pub fn render(&self, sub_path: &str, go_get: bool) -> Page {
        let start = Instant::now();

        // One snapshot for the whole request.
        let snapshot = self.snapshot.load_full();
        let ctx = PageContext::derive(&snapshot.projects.value, sub_path, &self.render, go_get);
        tracing::debug!(
            sub_path = %sub_path,
            listing = ctx.is_listing(),
            redirect = ctx.is_redirect(),
            "Derived page context"
        );
        let data = ctx.with_extra(&self.render.extra);

        let mut body = Vec::new();
        let error = match snapshot
            .templates
            .value
            .render_to(&self.render.root_template, &data, &mut body)
        {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    template = %e.template,
                    sub_path = %sub_path,
                    written = body.len(),
                    error = %e,
                    "Template execution failed"
                );
                Some(e)
            }
        };

        metrics::record_request(ctx.ga_action.map(|a| a.as_str()), error.is_none(), start);

        Page {
            body,
            refresh: ctx.refresh_header(self.render.redirect_delay_secs),
            action: ctx.ga_action,
            error,
        }
    }
}

fn load_store<T: SourceStore>(selector: &str) -> Result<Loaded<T>, LoadError> {
    match Loaded::<T>::load(selector) {
        Ok(loaded) => {
            tracing::info!(
                store = T::KIND,
                selector = %selector,
                files = loaded.fingerprint.len(),
                "Sources loaded"
            );
            metrics::record_reload(T::KIND, true);
            Ok(loaded)
        }
        Err(e) => {
            metrics::record_reload(T::KIND, false);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    const MAIN: &str = "{% if redirect_url %}redirect {{ ga_arg }}\
{% elif ga_action == 'List' %}list{% for key, p in projects|items %} {{ key }}{% endfor %}\
{% else %}generic{% endif %}";

    fn touch(path: &Path) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
    }

    struct Fixture {
        dir: tempfile::TempDir,
        sources: SourcesConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("templates")).unwrap();
            std::fs::create_dir(dir.path().join("projects")).unwrap();
            std::fs::write(dir.path().join("templates/main.tpl.html"), MAIN).unwrap();
            std::fs::write(
                dir.path().join("projects/a.json"),
                r#"{"rx": {"name": "rx", "import_path": "kylelemons.net/go/rx"}}"#,
            )
            .unwrap();
            let sources = SourcesConfig {
                templates: format!("{}/templates/*.tpl.*", dir.path().display()),
                projects: format!("{}/projects/*.json", dir.path().display()),
            };
            Self { dir, sources }
        }

        fn path(&self, rel: &str) -> std::path::PathBuf {
            self.dir.path().join(rel)
        }

        fn server(&self) -> ConfigServer {
            ConfigServer::load(&self.sources, RenderConfig::default(), true).unwrap()
        }
    }

    fn body(page: &Page) -> String {
        String::from_utf8(page.body.clone()).unwrap()
    }

    #[test]
    fn test_redirect_page() {
        let fx = Fixture::new();
        let page = fx.server().respond("rx", false);

        assert!(page.error.is_none());
        assert_eq!(body(&page), "redirect rx");
        assert_eq!(
            page.refresh.as_deref(),
            Some("3;url=http://godoc.org/kylelemons.net/go/rx")
        );
        assert_eq!(page.action, Some(Action::Documentation));
    }

    #[test]
    fn test_listing_and_generic_pages() {
        let fx = Fixture::new();
        let server = fx.server();

        let page = server.respond("", false);
        assert_eq!(body(&page), "list rx");
        assert!(page.refresh.is_none());

        let page = server.respond("nonexistent", false);
        assert!(page.error.is_none());
        assert_eq!(body(&page), "generic");
        assert!(page.refresh.is_none());
        assert!(page.action.is_none());
    }

    #[test]
    fn test_fresh_after_load() {
        let fx = Fixture::new();
        let server = fx.server();
        let report = server.reload_stale();
        assert_eq!(report.templates, StoreReload::Fresh);
        assert_eq!(report.projects, StoreReload::Fresh);
    }

    #[test]
    fn test_on_demand_reload_picks_up_changes() {
        let fx = Fixture::new();
        let server = fx.server();
        let before = server.snapshot();

        std::fs::write(
            fx.path("projects/b.json"),
            r#"{"atom": {"name": "atom", "import_path": "kylelemons.net/go/atom"}}"#,
        )
        .unwrap();

        let page = server.respond("", false);
        assert_eq!(body(&page), "list atom rx");

        let after = server.snapshot();
        assert_eq!(after.projects.value.len(), 2);
        // The untouched store is carried over, not reloaded.
        assert!(Arc::ptr_eq(&before.templates, &after.templates));
        // The old snapshot is still intact for readers that hold it.
        assert_eq!(before.projects.value.len(), 1);
    }

    #[test]
    fn test_reload_disabled() {
        let fx = Fixture::new();
        let server = ConfigServer::load(&fx.sources, RenderConfig::default(), false).unwrap();

        std::fs::write(fx.path("projects/a.json"), r#"{"other": {"import_path": "x/y"}}"#).unwrap();
        touch(&fx.path("projects/a.json"));

        let page = server.respond("rx", false);
        assert!(page.refresh.is_some());
        assert_eq!(server.snapshot().projects.value.len(), 1);
        assert!(server.snapshot().projects.value.get("rx").is_some());
    }

    #[test]
    fn test_malformed_reload_keeps_previous_snapshot() {
        let fx = Fixture::new();
        let server = fx.server();

        std::fs::write(fx.path("projects/b.json"), "{ broken").unwrap();
        let report = server.reload_stale();
        assert_eq!(report.projects, StoreReload::Failed);
        assert_eq!(report.templates, StoreReload::Fresh);

        // Still stale, still serving the old generation.
        let page = server.respond("rx", false);
        assert_eq!(body(&page), "redirect rx");
        assert_eq!(server.snapshot().projects.value.len(), 1);

        std::fs::write(fx.path("projects/b.json"), "{}").unwrap();
        touch(&fx.path("projects/b.json"));
        assert_eq!(server.reload_stale().projects, StoreReload::Reloaded);
        assert_eq!(server.reload_stale().projects, StoreReload::Fresh);
    }

    #[test]
    fn test_template_failure_does_not_block_projects() {
        let fx = Fixture::new();
        let server = fx.server();

        std::fs::write(fx.path("templates/main.tpl.html"), "{% for %}").unwrap();
        touch(&fx.path("templates/main.tpl.html"));
        std::fs::write(
            fx.path("projects/a.json"),
            r#"{"gofr": {"name": "gofr", "import_path": "kylelemons.net/go/gofr"}}"#,
        )
        .unwrap();
        touch(&fx.path("projects/a.json"));

        let report = server.reload_stale();
        assert_eq!(report.templates, StoreReload::Failed);
        assert_eq!(report.projects, StoreReload::Reloaded);

        let page = server.render("gofr", false);
        assert_eq!(body(&page), "redirect gofr");
        assert_eq!(
            page.refresh.as_deref(),
            Some("3;url=http://godoc.org/kylelemons.net/go/gofr")
        );
    }

    #[test]
    fn test_no_files_matched_keeps_snapshot() {
        let fx = Fixture::new();
        let server = fx.server();

        let selector = format!("{}/missing/*.json", fx.dir.path().display());
        assert!(matches!(
            server.load_projects(&selector),
            Err(LoadError::NoFilesMatched { .. })
        ));
        assert_eq!(server.snapshot().projects.selector, fx.sources.projects);
        assert_eq!(server.snapshot().projects.value.len(), 1);
    }

    #[test]
    fn test_missing_root_template_still_responds() {
        let fx = Fixture::new();
        let render = RenderConfig {
            root_template: "absent".to_string(),
            ..Default::default()
        };
        let server = ConfigServer::load(&fx.sources, render, true).unwrap();

        let page = server.respond("rx", false);
        assert!(page.error.is_some());
        assert!(page.body.is_empty());
        assert!(page.refresh.is_some());
    }

    #[test]
    fn test_initial_load_failure_is_returned() {
        let fx = Fixture::new();
        let sources = SourcesConfig {
            templates: fx.sources.templates.clone(),
            projects: format!("{}/nothing/*.json", fx.dir.path().display()),
        };
        assert!(ConfigServer::load(&sources, RenderConfig::default(), true).is_err());
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let fx = Fixture::new();
        let server = Arc::new(fx.server());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let server = server.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = server.snapshot();
                        let n = snapshot.projects.value.len();
                        // Every generation written below is internally consistent.
                        assert!(n == 1 || n == 2, "unexpected catalog size {}", n);
                        assert!(snapshot.templates.value.contains("main"));
                    }
                })
            })
            .collect();

        for i in 0..20 {
            let contents = if i % 2 == 0 {
                r#"{"rx": {"import_path": "a/rx"}, "atom": {"import_path": "a/atom"}}"#
            } else {
                r#"{"rx": {"import_path": "a/rx"}}"#
            };
            std::fs::write(fx.path("projects/a.json"), contents).unwrap();
            server.force_reload();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
