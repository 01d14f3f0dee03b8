//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, mount point, timeout)
//!     → request.rs (request ID for the trace span)
//!     → ConfigServer::respond on the blocking pool
//!     → page response (200, optional Refresh header)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
