//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (bind address parses, selectors non-empty)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VanityConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::VanityConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &VanityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if let Err(e) = config.listener.socket_addr() {
        fail(
            "listener.bind_address",
            format!("{:?} is not a socket address: {}", config.listener.bind_address, e),
        );
    }
    if !config.listener.mount_path.starts_with('/') {
        fail("listener.mount_path", "must start with '/'".to_string());
    }
    if config.sources.templates.trim().is_empty() {
        fail("sources.templates", "selector must not be empty".to_string());
    }
    if config.sources.projects.trim().is_empty() {
        fail("sources.projects", "selector must not be empty".to_string());
    }
    if config.render.root_template.is_empty() {
        fail("render.root_template", "must not be empty".to_string());
    }
    if config.render.doc_host.is_empty() {
        fail("render.doc_host", "must not be empty".to_string());
    }
    if config.timeouts.request_secs == 0 {
        fail("timeouts.request_secs", "must be greater than zero".to_string());
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        fail(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
