//! Server tuning knobs.

use std::time::Duration;

/// Configuration for a [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Work queue capacity, in submissions. Full queues apply backpressure.
    pub queue_capacity: usize,
    /// Soft cap on puts per epoch. A single submission is never split.
    pub max_batch: usize,
    /// How long to wait after the first put of a batch for more to arrive.
    pub batch_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_batch: 1024,
            batch_window: Duration::ZERO,
        }
    }
}
