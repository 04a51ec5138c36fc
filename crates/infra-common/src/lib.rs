//! # Common infrastructure for outdial
//!
//! Shared plumbing used by the call engine and the command-line tool:
//!
//! - [`logging`]: `tracing-subscriber` setup with env-filter and optional JSON output
//! - [`tasks`]: background tasks that can be cancelled and joined by their owner
//! - [`errors`]: the infrastructure error type

pub mod errors;
pub mod logging;
pub mod tasks;

pub use errors::{Error, Result};
