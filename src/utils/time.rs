//! Time and timestamp utilities

use std::time::Instant;

use chrono::Utc;

/// Current time as an RFC 3339 string, as carried on the wire
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Milliseconds elapsed since `start`, with sub-millisecond precision
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
