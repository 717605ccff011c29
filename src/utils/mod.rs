//! Utility functions and helpers
//!
//! This module contains timestamp utilities and logging setup.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::{elapsed_ms, now_rfc3339};
