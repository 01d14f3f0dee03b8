//! Page templates.
//!
//! Every file matched by the templates selector is compiled into one
//! `minijinja` environment. A file is addressable by its file name
//! (`main.tpl.html`) and by its stem before the first dot (`main`), so
//! templates can include each other either way.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::error::{LoadError, RenderError};
use crate::sources::{read_sources, SourceFile, SourceFingerprint, SourceStore};

/// A compiled set of named templates.
pub struct TemplateSet {
    env: Environment<'static>,
    names: Vec<String>,
}

impl TemplateSet {
    /// Compile the given source files. The first syntax error aborts.
    pub fn from_sources(files: Vec<SourceFile>) -> Result<Self, LoadError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        let mut names = Vec::new();
        for file in files {
            let file_name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = file_name.split('.').next().unwrap_or_default().to_string();

            let aliases = if stem == file_name { vec![file_name] } else { vec![file_name, stem] };
            for name in aliases {
                if name.is_empty() {
                    continue;
                }
                // Later files replace earlier ones registered under the same name.
                env.add_template_owned(name.clone(), file.contents.clone())
                    .map_err(|e| LoadError::Parse {
                        path: file.path.clone(),
                        source: Box::new(e),
                    })?;
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        Ok(Self { env, names })
    }

    /// Names of every registered template.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Render `name` into `out`.
    ///
    /// On failure `out` keeps whatever was written before the error.
    pub fn render_to<S: Serialize>(
        &self,
        name: &str,
        ctx: S,
        out: &mut Vec<u8>,
    ) -> Result<(), RenderError> {
        let render_err = |source: minijinja::Error| RenderError {
            template: name.to_string(),
            source,
        };
        let template = self.env.get_template(name).map_err(render_err)?;
        template
            .render_captured_to(ctx, &mut *out)
            .map_err(render_err)?;
        Ok(())
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet").field("names", &self.names).finish()
    }
}

impl SourceStore for TemplateSet {
    const KIND: &'static str = "templates";

    fn load(selector: &str) -> Result<(Self, SourceFingerprint), LoadError> {
        let (files, fingerprint) = read_sources(selector)?;
        let set = Self::from_sources(files)?;
        tracing::debug!(selector = %selector, templates = ?set.names, "Compiled templates");
        Ok((set, fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn write_templates(files: &[(&str, &str)]) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let selector = format!("{}/*.tpl.*", dir.path().display());
        (dir, selector)
    }

    #[test]
    fn test_registers_file_name_and_stem() {
        let (_dir, selector) = write_templates(&[
            ("header.tpl.html", "<h1>{{ title }}</h1>"),
            ("main.tpl.html", r#"{% include "header" %}<p>body</p>"#),
        ]);
        let (set, fingerprint) = TemplateSet::load(&selector).unwrap();

        assert_eq!(fingerprint.len(), 2);
        assert!(set.contains("main"));
        assert!(set.contains("main.tpl.html"));
        assert!(set.contains("header"));

        let mut out = Vec::new();
        set.render_to("main", context! { title => "<vanity>" }, &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<h1>&lt;vanity&gt;</h1><p>body</p>"
        );
    }

    #[test]
    fn test_syntax_error_names_file() {
        let (_dir, selector) = write_templates(&[
            ("good.tpl.html", "ok"),
            ("main.tpl.html", "{% if %}"),
        ]);
        match TemplateSet::load(&selector) {
            Err(LoadError::Parse { path, .. }) => assert!(path.ends_with("main.tpl.html")),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_template_is_render_error() {
        let (_dir, selector) = write_templates(&[("other.tpl.html", "ok")]);
        let (set, _) = TemplateSet::load(&selector).unwrap();

        let mut out = Vec::new();
        let err = set.render_to("main", context! {}, &mut out).unwrap_err();
        assert_eq!(err.template, "main");
        assert!(out.is_empty());
    }

    #[test]
    fn test_failed_render_keeps_partial_output() {
        let (_dir, selector) =
            write_templates(&[("main.tpl.html", "before{{ missing.field }}after")]);
        let (set, _) = TemplateSet::load(&selector).unwrap();

        let mut out = Vec::new();
        let err = set.render_to("main", context! {}, &mut out).unwrap_err();
        assert_eq!(err.template, "main");
        assert_eq!(String::from_utf8(out).unwrap(), "before");
    }
}
