//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging → Initial source load (fatal on error)
//!     → Start watcher / metrics → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Force a reload of every source
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
