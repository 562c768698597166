//! Error types for RPC transports.

/// Errors that can occur while delivering an RPC.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to reach the remote address.
    #[error("connection error: {0}")]
    Connect(String),

    /// The remote address is marked down or has no handler.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The call was dropped in flight.
    #[error("call dropped")]
    Dropped,

    /// Socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Frame exceeds the size limit.
    #[error("message too large: {len} bytes (max {max})")]
    MessageTooLarge {
        /// Declared frame length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The peer closed the stream before replying.
    #[error("stream closed")]
    StreamClosed,
}
