//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: selector, path, store, error)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs (stderr + appended log file)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Reload failures are logged, never surfaced to clients
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
