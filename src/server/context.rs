//! Per-request template context.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{ProjectCatalog, ProjectRecord};
use crate::config::RenderConfig;

/// Analytics action reported for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    /// The root page listing every project.
    List,
    /// A project page redirecting to its documentation.
    Documentation,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "List",
            Action::Documentation => "Documentation",
        }
    }
}

/// Values available to the root template.
///
/// Keys seen by templates:
/// - `projects`: the whole catalog, sub-path → project
/// - `project`: the project matched by the request path, if any
/// - `redirect_url`: documentation URL being redirected to, if any
/// - `ga_id`, `ga_action`, `ga_arg`: analytics values
/// - `go_get`: true for `?go-get=1` requests from the go tool
///
/// Extension values from [`RenderConfig::extra`] are merged last and win.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext<'a> {
    pub projects: &'a ProjectCatalog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<&'a ProjectRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub ga_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga_action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga_arg: Option<&'a str>,
    pub go_get: bool,
}

impl<'a> PageContext<'a> {
    /// Derive the context for `sub_path` (the request path below the mount
    /// point, leading '/' already stripped).
    pub fn derive(
        catalog: &'a ProjectCatalog,
        sub_path: &'a str,
        render: &'a RenderConfig,
        go_get: bool,
    ) -> Self {
        let mut ctx = Self {
            projects: catalog,
            project: None,
            redirect_url: None,
            ga_id: &render.analytics_id,
            ga_action: None,
            ga_arg: None,
            go_get,
        };

        if sub_path.is_empty() {
            ctx.ga_action = Some(Action::List);
        } else if let Some(project) = catalog.get(sub_path) {
            ctx.project = Some(project);
            if project.is_servable() {
                ctx.ga_action = Some(Action::Documentation);
                ctx.ga_arg = Some(sub_path);
                ctx.redirect_url = Some(format!("{}{}", render.doc_host, project.import_path));
            }
        }
        ctx
    }

    pub fn is_listing(&self) -> bool {
        self.ga_action == Some(Action::List)
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_url.is_some()
    }

    /// Value for the delayed-redirect `Refresh` header.
    pub fn refresh_header(&self, delay_secs: u64) -> Option<String> {
        self.redirect_url
            .as_ref()
            .map(|url| format!("{};url={}", delay_secs, url))
    }

    /// Flatten into the map handed to the template engine, with `extra`
    /// overriding any built-in key.
    pub fn with_extra(
        &self,
        extra: &BTreeMap<String, serde_json::Value>,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut data = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => serde_json::Map::new(),
            Err(e) => {
                tracing::error!(error = %e, "Cannot serialize page context");
                serde_json::Map::new()
            }
        };
        for (key, value) in extra {
            data.insert(key.clone(), value.clone());
        }
        data
    }
}
