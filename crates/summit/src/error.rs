//! Unified error type for Summit.

use summit_protocol::ProtocolError;
use summit_room::RoomError;
use summit_transport::{ConnectionId, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant generates the `From`
/// impls, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SummitError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid movement).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, stopped, unknown participant).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The connection is not bound to any room.
    #[error("connection {0} is not in a room")]
    Unbound(ConnectionId),
}
