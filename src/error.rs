//! Error types for source loading and page rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load a store from its source files.
///
/// A load either fully succeeds or fails with one of these; the previously
/// installed snapshot is never touched by a failed load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The selector pattern could not be resolved.
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    /// The selector resolved to zero files.
    #[error("selector {selector:?} matched no files")]
    NoFilesMatched { selector: String },

    /// A matched file could not be stat'ed or read.
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched file has malformed content.
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoadError {
    /// The offending source file, if the error is tied to one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoadError::Io { path, .. } | LoadError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Template execution failed, possibly after output was produced.
#[derive(Debug, Error)]
#[error("executing template {template:?}: {source}")]
pub struct RenderError {
    pub template: String,
    #[source]
    pub source: minijinja::Error,
}
