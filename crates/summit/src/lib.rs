//! # Summit
//!
//! Real-time host for small vertical races.
//!
//! Clients connect over WebSocket and are placed in a room. When a room
//! fills it counts down, the race runs, and the first participant to
//! reach the goal wins. Movement reports are relayed to roommates as they
//! arrive; the server keeps no physics of its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use summit::prelude::*;
//!
//! # async fn start() -> Result<(), SummitError> {
//! let server = SummitServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .match_config(MatchConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod gateway;
mod handler;
mod server;
pub mod telemetry;

pub use error::SummitError;
pub use gateway::Gateway;
pub use server::{SummitServer, SummitServerBuilder};

pub mod prelude {
    pub use crate::telemetry::init_tracing;
    pub use crate::{Gateway, SummitError, SummitServer, SummitServerBuilder};
    pub use summit_protocol::{
        ClientEvent, Codec, JsonCodec, MovementBroadcast, MovementReport, Participant,
        ParticipantId, PlayerCount, RoomId, ServerEvent,
    };
    pub use summit_room::{
        JoinOrderPolicy, MatchConfig, PositionTracking, RoomError, RoomState, SpawnPoint,
    };
    pub use summit_tick::TickConfig;
    pub use summit_transport::ConnectionId;
}
