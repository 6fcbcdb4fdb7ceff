//! Event and payload types for Summit's wire format.
//!
//! Names follow the browser client: event names and payload fields are
//! camelCase, ids are plain numbers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use summit_transport::ConnectionId;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identity of a participant, stable for one connection's lifetime.
///
/// Serialized as a bare number (`#[serde(transparent)]`); as a map key it
/// becomes the number's string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for ParticipantId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// Identity of a room. Allocated in creation order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a room receives an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every occupant of the room.
    All,
    /// One occupant.
    Participant(ParticipantId),
    /// Every occupant except one (usually the sender).
    AllExcept(ParticipantId),
}

impl Recipient {
    /// Whether `id` is addressed by this recipient.
    pub fn includes(&self, id: ParticipantId) -> bool {
        match self {
            Self::All => true,
            Self::Participant(target) => *target == id,
            Self::AllExcept(excluded) => *excluded != id,
        }
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One player inside a room, as the room tracks it and as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub player_id: ParticipantId,
    /// 0-based spawn slot assigned at admission. Never reassigned.
    #[serde(rename = "order")]
    pub join_order: u32,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Sprite rotation; the server never changes it.
    pub rotation: f64,
    /// 1-based admission rank shown to players.
    pub friendly_name: u32,
    #[serde(rename = "roomNum")]
    pub room_id: RoomId,
    /// Reserved for a manual ready-up flow; always `false`.
    pub ready: bool,
}

// ---------------------------------------------------------------------------
// Movement payloads
// ---------------------------------------------------------------------------

/// Position and velocity reported by a client in `playerMovement`.
///
/// Unknown fields are ignored so older or richer clients keep working.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementReport {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
}

impl MovementReport {
    /// Checks that every coordinate is a finite number.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMovement`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (field, value) in [("px", self.px), ("py", self.py), ("vx", self.vx), ("vy", self.vy)] {
            if !value.is_finite() {
                return Err(ProtocolError::InvalidMovement { field });
            }
        }
        Ok(())
    }

    /// The report stamped with the id of the participant that sent it.
    pub fn stamped(self, player_id: ParticipantId) -> MovementBroadcast {
        MovementBroadcast {
            px: self.px,
            py: self.py,
            vx: self.vx,
            vy: self.vy,
            player_id,
        }
    }
}

/// A movement report relayed to other occupants (`playerMoved`,
/// `resetPlayer`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementBroadcast {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub player_id: ParticipantId,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// Disconnects are not an event: the transport reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    PlayerMovement(MovementReport),
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full roster, sent once to a newly admitted participant.
    CurrentPlayers(BTreeMap<ParticipantId, Participant>),
    /// Someone else joined; `room_size` counts them.
    NewPlayer {
        player: Participant,
        room_size: usize,
    },
    /// Someone left; `room_size` no longer counts them.
    DisconnectPlayer {
        player_id: ParticipantId,
        room_size: usize,
    },
    PlayerMoved(MovementBroadcast),
    /// The mover fell below the world and must respawn.
    ResetPlayer(MovementBroadcast),
    /// Room is full; the countdown is about to start.
    ReadyUp,
    /// Seconds left before the start.
    CurrentCountdown(u32),
    /// Movement is frozen; clients reset to their spawn slot.
    Prep,
    StartGame,
    /// Friendly name of the winner.
    GameOver(u32),
}

impl ServerEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CurrentPlayers(_) => "currentPlayers",
            Self::NewPlayer { .. } => "newPlayer",
            Self::DisconnectPlayer { .. } => "disconnectPlayer",
            Self::PlayerMoved(_) => "playerMoved",
            Self::ResetPlayer(_) => "resetPlayer",
            Self::ReadyUp => "readyUp",
            Self::CurrentCountdown(_) => "currentCountdown",
            Self::Prep => "prep",
            Self::StartGame => "startGame",
            Self::GameOver(_) => "gameOver",
        }
    }
}

/// Occupancy figure of the room currently accepting players, as served
/// by `GET /playerCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub current: usize,
    pub total: usize,
}
