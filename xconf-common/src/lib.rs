//! Shared plumbing for the xconf crates.
//!
//! Only logging lives here for now: [`observability::init_logging`] installs the
//! process-wide `tracing` subscriber used by the server binary and by tests.
pub mod observability;

pub use observability::{init_logging, LogConfig, LogFormat};
