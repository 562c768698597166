use std::time::Duration;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between self-monitoring polls while a put is pending.
    pub poll_interval: Duration,
    /// Polls to wait before resubmitting a put that has not landed, unless
    /// the server has already sealed two epochs without it.
    pub resubmit_polls: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            resubmit_polls: 20,
        }
    }
}
