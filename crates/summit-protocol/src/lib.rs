//! Wire protocol for Summit.
//!
//! Every frame is one named event with an optional payload:
//!
//! ```text
//! {"event": "playerMovement", "data": {"px": 115.0, "py": 1260.0, "vx": 0.0, "vy": -4.0}}
//! {"event": "readyUp"}
//! ```
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Participant`]):
//!   what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become frames.
//! - **Errors** ([`ProtocolError`]): malformed frames and payloads.
//!
//! The protocol layer knows nothing about rooms or timers; it only
//! describes and validates the messages rooms exchange with clients.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, MovementBroadcast, MovementReport, Participant, ParticipantId, PlayerCount,
    Recipient, RoomId, ServerEvent,
};
