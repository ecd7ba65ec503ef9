use thiserror::Error;

/// Error types surfaced by the gateway client.
///
/// This enum covers connection establishment, the lifetime of a correlated
/// request, and configuration validation. Duplicate or unrecognized inbound
/// events are never surfaced as errors; they are logged and handed to the
/// caller's event sink instead.
#[derive(Error, Debug)]
pub enum FxgateError {
    /// The adapter could not establish a session
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No terminal event arrived within the caller's deadline
    #[error("request timed out")]
    Timeout,

    /// The gateway explicitly rejected the request
    #[error("request rejected: {reason}")]
    Rejected {
        /// Reason string carried by the reject event
        reason: String,
    },

    /// The transport dropped while the request was outstanding
    #[error("transport failed while request was outstanding")]
    Transport,

    /// A communication channel was closed unexpectedly
    #[error("channel closed unexpectedly")]
    ChannelClosed,

    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session is not in a state that allows the operation
    #[error("session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, FxgateError>;
