//! Shared utilities for Concord.

pub mod logging;

pub use logging::{init_logging, init_tracing, LogFormat, LoggingError};
