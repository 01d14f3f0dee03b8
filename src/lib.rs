//! Vanity package page server with hot-reloadable templates and projects.

pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod sources;
pub mod templates;

pub use catalog::{ProjectCatalog, ProjectRecord};
pub use config::schema::VanityConfig;
pub use error::{LoadError, RenderError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use server::ConfigServer;
pub use templates::TemplateSet;
