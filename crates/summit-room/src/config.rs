//! Match configuration and the room lifecycle states.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use summit_tick::TickConfig;

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Where participants spawn. Slot `n` spawns at
/// `(x + n * x_offset, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
    pub x_offset: f64,
}

impl SpawnPoint {
    /// Spawn coordinates for a join-order slot.
    pub fn for_slot(&self, join_order: u32) -> (f64, f64) {
        (self.x + join_order as f64 * self.x_offset, self.y)
    }
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            x: 115.0,
            y: 1260.0,
            x_offset: 235.0,
        }
    }
}

/// How a participant's join order (and spawn slot) is chosen.
///
/// Both policies keep join orders inside `0..capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinOrderPolicy {
    /// The number of occupants at join time. After a departure the next
    /// participant can share a slot with a remaining occupant.
    #[default]
    OccupantCount,
    /// The lowest slot no current occupant holds. Never shares a slot.
    LowestFreeSlot,
}

/// How a movement report updates the server-tracked position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionTracking {
    /// `x += px + vx`, `y += py + vy`. The stored position is a running
    /// sum, not a coordinate; nothing in the room reads it back.
    #[default]
    Accumulate,
    /// Store the reported position and velocity as-is.
    Overwrite,
}

/// Tunables for one match. Every room a directory creates shares one copy.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Participants needed to fill (and start) a room.
    pub capacity: usize,
    /// Length of the numeric countdown, in ticks.
    pub countdown_time: u32,
    /// Countdown value at which movement freezes and players reset.
    /// Must be below `countdown_time`.
    pub prepare_time: u32,
    /// Silent buffer between `readyUp` and the numeric countdown, in ticks.
    pub ready_up_time: u32,
    /// A reported `py` at or above this is a fall off the world.
    pub below_world: f64,
    /// A reported `py` at or below this wins the match.
    pub goal_location: f64,
    pub spawn: SpawnPoint,
    pub join_order: JoinOrderPolicy,
    pub position_tracking: PositionTracking,
    /// Countdown tick cadence. One tick is one second of countdown.
    pub tick: TickConfig,
    /// How long a finished room lingers before its actor stops.
    pub end_grace: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            countdown_time: 10,
            prepare_time: 3,
            ready_up_time: 5,
            below_world: 2400.0,
            goal_location: 0.0,
            spawn: SpawnPoint::default(),
            join_order: JoinOrderPolicy::default(),
            position_tracking: PositionTracking::default(),
            tick: TickConfig::default(),
            end_grace: Duration::from_secs(30),
        }
    }
}

impl MatchConfig {
    /// Countdown value armed when a room fills.
    pub fn countdown_start(&self) -> u32 {
        self.countdown_time + self.ready_up_time + 1
    }

    /// Clamp values that would break the lifecycle.
    ///
    /// - `capacity` is at least 1.
    /// - `prepare_time` is below `countdown_time` (a zero countdown
    ///   leaves no prep phase).
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            tracing::warn!("capacity 0 is unusable, clamping to 1");
            self.capacity = 1;
        }
        if self.prepare_time >= self.countdown_time {
            let clamped = self.countdown_time.saturating_sub(1);
            tracing::warn!(
                prepare_time = self.prepare_time,
                countdown_time = self.countdown_time,
                clamped,
                "prepare_time must be below countdown_time, clamping"
            );
            self.prepare_time = clamped;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions only move forward:
///
/// ```text
/// Waiting → Ready → Countdown → Prep → Running → End
/// ```
///
/// - **Waiting**: accepting participants.
/// - **Ready**: full; the silent ready-up buffer is running.
/// - **Countdown**: numbers are being announced each second.
/// - **Prep**: last seconds of the countdown; movement is frozen and
///   clients snap back to their spawn slots.
/// - **Running**: race is on; the first goal crossing wins.
/// - **End**: a winner was announced. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomState {
    Waiting,
    Ready,
    Countdown,
    Prep,
    Running,
    End,
}

impl RoomState {
    /// Returns `true` if the room admits new participants.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if movement reports are applied.
    pub fn accepts_movement(&self) -> bool {
        !matches!(self, Self::Prep)
    }

    /// Returns `true` while the countdown timer should be live.
    pub fn is_counting_down(&self) -> bool {
        matches!(self, Self::Ready | Self::Countdown | Self::Prep)
    }

    /// The state that follows this one, or `None` for End.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Ready),
            Self::Ready => Some(Self::Countdown),
            Self::Countdown => Some(Self::Prep),
            Self::Prep => Some(Self::Running),
            Self::Running => Some(Self::End),
            Self::End => None,
        }
    }

    /// Returns `true` if `target` directly follows this state.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Waiting => "Waiting",
            Self::Ready => "Ready",
            Self::Countdown => "Countdown",
            Self::Prep => "Prep",
            Self::Running => "Running",
            Self::End => "End",
        };
        f.write_str(name)
    }
}
