//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → VanityConfig (validated, immutable)
//!
//! Templates and projects are NOT part of this config: they are sources
//! named by selector patterns and reloaded by the server itself.
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only sources are hot-reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::VanityConfig;
pub use schema::{
    ListenerConfig, ObservabilityConfig, ReloadConfig, RenderConfig, SourcesConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
