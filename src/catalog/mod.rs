//! Project catalog: the sub-path → project mapping served by the vanity pages.
//!
//! # Data Flow
//! ```text
//! projects selector (glob)
//!     → sources::read_sources (ordered files)
//!     → serde_json (one object per file, keyed by sub-path)
//!     → merged in match order, last write wins
//!     → ProjectCatalog (immutable, replaced whole on reload)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::sources::{read_sources, SourceFingerprint, SourceStore};

/// One advertised package.
///
/// Field names are accepted both in snake_case and in the capitalised form
/// used by older project files (`Name`, `Desc`, `Import`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRecord {
    /// Display name.
    #[serde(alias = "Name")]
    pub name: String,

    /// Short textual description.
    #[serde(alias = "Desc")]
    pub description: String,

    /// Extra links, label → URL.
    #[serde(alias = "Links")]
    pub links: BTreeMap<String, String>,

    /// Exact import path (e.g. "kylelemons.net/go/rx").
    #[serde(alias = "Import")]
    pub import_path: String,

    /// Version control system (e.g. "git", "hg").
    #[serde(alias = "VCS")]
    pub vcs: String,

    /// Repository checkout URI.
    #[serde(alias = "Repo")]
    pub repo: String,

    /// Source browsing template for the "go-source" meta tag.
    #[serde(alias = "Source")]
    pub source: String,

    /// Not listed for humans; still resolvable by sub-path.
    #[serde(alias = "Hidden")]
    pub hidden: bool,
}

impl ProjectRecord {
    /// A record can only be redirected to if it names an import path.
    pub fn is_servable(&self) -> bool {
        !self.import_path.is_empty()
    }
}

/// Mapping from sub-path to project record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectCatalog {
    projects: BTreeMap<String, ProjectRecord>,
}

impl ProjectCatalog {
    pub fn new(projects: BTreeMap<String, ProjectRecord>) -> Self {
        Self { projects }
    }

    /// Look up the project served at `sub_path`.
    pub fn get(&self, sub_path: &str) -> Option<&ProjectRecord> {
        self.projects.get(sub_path)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectRecord)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Records a listing page would show to humans.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &ProjectRecord)> {
        self.iter().filter(|(_, p)| !p.hidden)
    }
}

impl FromIterator<(String, ProjectRecord)> for ProjectCatalog {
    fn from_iter<I: IntoIterator<Item = (String, ProjectRecord)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl SourceStore for ProjectCatalog {
    const KIND: &'static str = "projects";

    fn load(selector: &str) -> Result<(Self, SourceFingerprint), LoadError> {
        let (files, fingerprint) = read_sources(selector)?;

        let mut projects = BTreeMap::new();
        for file in files {
            let batch: BTreeMap<String, ProjectRecord> = serde_json::from_str(&file.contents)
                .map_err(|e| LoadError::Parse {
                    path: file.path.clone(),
                    source: Box::new(e),
                })?;
            tracing::debug!(path = %file.path.display(), projects = batch.len(), "Parsed project file");
            projects.extend(batch);
        }

        Ok((Self::new(projects), fingerprint))
    }
}
