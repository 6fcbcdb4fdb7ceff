//! Rooms for Summit.
//!
//! A room is a small match: it fills to capacity, counts down, races,
//! and ends when the first participant reaches the goal.
//!
//! # Key types
//!
//! - [`Room`]: the synchronous lifecycle state machine
//! - [`RoomHandle`]: talks to a room running as an isolated Tokio task
//! - [`RoomDirectory`]: creates rooms and routes newcomers into them
//! - [`RoomState`]: `Waiting → Ready → Countdown → Prep → Running → End`
//! - [`MatchConfig`]: capacity, countdown lengths, world bounds

mod config;
mod directory;
mod error;
mod lifecycle;
mod room;

pub use config::{JoinOrderPolicy, MatchConfig, PositionTracking, RoomState, SpawnPoint};
pub use directory::{Assignment, RoomDirectory};
pub use error::RoomError;
pub use lifecycle::{Admission, Outbound, Room};
pub use room::{ParticipantSender, RoomHandle, RoomInfo};
