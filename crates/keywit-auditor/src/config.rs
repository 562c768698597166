//! Auditor tuning knobs.

use std::time::Duration;

/// Configuration for an [`Auditor`](crate::Auditor).
#[derive(Debug, Clone)]
pub struct AuditorConfig {
    /// Delay between pulls in [`Auditor::run`](crate::Auditor::run).
    pub poll_interval: Duration,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}
