//! Server statistics

use serde::{Deserialize, Serialize};

/// Counters reported by the protocol server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    pub tools_registered: u64,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub clients: usize,
    pub success_rate: f64,
    pub dropped_notifications: u64,
}

impl ServerStats {
    /// Successful calls over total calls, 0 when nothing was called
    pub fn compute_success_rate(successful: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        }
    }
}
