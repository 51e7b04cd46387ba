//! Cache Test POC API.
//!
//! A small demonstration service used to exercise Docker layer caching in
//! merge-group CI builds. It serves three informational JSON endpoints and
//! shuts down gracefully on SIGTERM/SIGINT.
//!
//! ```text
//! GET /            service name, version, environment
//! GET /health      liveness with process uptime
//! GET /cache-info  build metadata injected by CI
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`api`]: Routes, handlers and middleware
//! - [`server`]: Listener ownership and serving
//! - [`shutdown`]: Graceful shutdown state machine
//! - [`metrics`]: Request metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, Result, ServiceError};
pub use server::Server;
pub use shutdown::{Shutdown, ShutdownOutcome, ShutdownState};
