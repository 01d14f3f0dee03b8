//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the vanity server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VanityConfig {
    /// Listener configuration (bind address, mount point).
    pub listener: ListenerConfig,

    /// Where templates and projects are loaded from.
    pub sources: SourcesConfig,

    /// When sources are reloaded.
    pub reload: ReloadConfig,

    /// Values exposed to templates and redirect settings.
    pub render: RenderConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8002" or ":8002").
    pub bind_address: String,

    /// Path prefix the pages are served under; stripped before lookup.
    pub mount_path: String,
}

impl ListenerConfig {
    /// Parse the bind address, accepting the host-less ":port" form.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        match self.bind_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port).parse(),
            None => self.bind_address.parse(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8002".to_string(),
            mount_path: "/".to_string(),
        }
    }
}

/// Selector patterns for the two stores.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Glob matching template files.
    pub templates: String,

    /// Glob matching JSON project files.
    pub projects: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            templates: "templates/*.tpl.*".to_string(),
            projects: "projects.json".to_string(),
        }
    }
}

/// Reload triggers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Check sources for staleness on every request.
    pub on_demand: bool,

    /// Watch source directories and reload in the background.
    pub watch: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            on_demand: true,
            watch: false,
        }
    }
}

/// Rendering settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Analytics property ID passed to templates as `ga_id`.
    pub analytics_id: String,

    /// Prefix joined with a project's import path to form the redirect.
    pub doc_host: String,

    /// Seconds before the browser follows the redirect.
    pub redirect_delay_secs: u64,

    /// Template executed for every request.
    pub root_template: String,

    /// Extra template values; these override built-in keys of the same name.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            analytics_id: String::new(),
            doc_host: "http://godoc.org/".to_string(),
            redirect_delay_secs: 3,
            root_template: "main".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log file appended to alongside stderr. Empty disables file logging.
    pub log_file: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_file: "vanity.log".to_string(),
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
