//! Error types for the protocol layer.

/// Errors raised while framing or validating events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound event failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not a well-formed event (bad JSON, unknown event
    /// name, missing payload fields).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A movement report decoded but carries a non-finite coordinate.
    #[error("invalid movement: {field} is not finite")]
    InvalidMovement {
        /// The offending payload field (`px`, `py`, `vx`, or `vy`).
        field: &'static str,
    },
}
