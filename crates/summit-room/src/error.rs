//! Error types for the room layer.

use summit_protocol::{ParticipantId, RoomId};

use crate::RoomState;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Admission into a room with no free slot. The directory never
    /// routes a participant into a full room, so this is a consistency
    /// fault when it happens.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The participant is already in this room.
    #[error("participant {0} already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomId),

    /// The participant is not in this room.
    #[error("participant {0} not in room {1}")]
    NotInRoom(ParticipantId, RoomId),

    /// The participant is not in any room the directory knows.
    #[error("participant {0} is not in any room")]
    Unassigned(ParticipantId),

    /// Admission into a room whose match has already started.
    #[error("room {room} is {state}, not accepting participants")]
    NotJoinable { room: RoomId, state: RoomState },

    /// The room's actor has stopped or its command queue is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
