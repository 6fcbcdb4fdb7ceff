//! The room state machine.
//!
//! [`Room`] is synchronous and owns nothing but data: every input
//! (admission, departure, movement, countdown tick) is a method call that
//! returns the events to deliver, tagged with their [`Recipient`]. Timing
//! and delivery belong to the room actor in `room.rs`.

use std::collections::BTreeMap;

use summit_protocol::{MovementReport, Participant, ParticipantId, Recipient, RoomId, ServerEvent};

use crate::{JoinOrderPolicy, MatchConfig, PositionTracking, RoomError, RoomState};

/// One event addressed to some of the room's occupants.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub event: ServerEvent,
}

impl Outbound {
    fn to(recipient: Recipient, event: ServerEvent) -> Self {
        Self { recipient, event }
    }
}

/// Result of a successful admission.
#[derive(Debug, Clone)]
pub struct Admission {
    /// The participant as the room now tracks it.
    pub participant: Participant,
    pub outbound: Vec<Outbound>,
}

/// One match: roster, lifecycle state, and countdown counter.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    config: MatchConfig,
    state: RoomState,
    /// Admission order is roster order.
    participants: Vec<Participant>,
    /// Seconds left while the countdown is live.
    countdown: Option<u32>,
    winner: Option<ParticipantId>,
}

impl Room {
    /// An empty room in `Waiting`.
    pub fn new(id: RoomId, config: MatchConfig) -> Self {
        Self {
            id,
            config,
            state: RoomState::Waiting,
            participants: Vec::new(),
            countdown: None,
            winner: None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.config.capacity
    }

    pub fn is_player_present(&self, id: ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.player_id == id)
    }

    /// Occupants in admission order.
    pub fn roster(&self) -> &[Participant] {
        &self.participants
    }

    /// Seconds left on the countdown, if it is live.
    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    /// The participant whose goal crossing ended the match.
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    fn roster_map(&self) -> BTreeMap<ParticipantId, Participant> {
        self.participants
            .iter()
            .map(|p| (p.player_id, p.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Admits a participant and, if that fills the room, moves to Ready.
    ///
    /// The newcomer gets `currentPlayers`; everybody else gets `newPlayer`.
    ///
    /// # Errors
    /// - [`RoomError::NotJoinable`] if the match sequence has begun.
    /// - [`RoomError::RoomFull`] if every slot is taken.
    /// - [`RoomError::AlreadyInRoom`] if `id` is already an occupant.
    pub fn admit(&mut self, id: ParticipantId) -> Result<Admission, RoomError> {
        if !self.state.is_joinable() {
            return Err(RoomError::NotJoinable {
                room: self.id,
                state: self.state,
            });
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.id));
        }
        if self.is_player_present(id) {
            return Err(RoomError::AlreadyInRoom(id, self.id));
        }

        let join_order = match self.config.join_order {
            JoinOrderPolicy::OccupantCount => self.participants.len() as u32,
            JoinOrderPolicy::LowestFreeSlot => (0..)
                .find(|slot| self.participants.iter().all(|p| p.join_order != *slot))
                .unwrap_or(0),
        };
        let (x, y) = self.config.spawn.for_slot(join_order);
        let participant = Participant {
            player_id: id,
            join_order,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            rotation: 0.0,
            friendly_name: join_order + 1,
            room_id: self.id,
            ready: false,
        };
        self.participants.push(participant.clone());

        tracing::info!(
            room_id = %self.id,
            participant_id = %id,
            join_order,
            occupants = self.participants.len(),
            "participant admitted"
        );

        let mut outbound = vec![
            Outbound::to(
                Recipient::Participant(id),
                ServerEvent::CurrentPlayers(self.roster_map()),
            ),
            Outbound::to(
                Recipient::AllExcept(id),
                ServerEvent::NewPlayer {
                    player: participant.clone(),
                    room_size: self.participants.len(),
                },
            ),
        ];

        if self.is_full() {
            outbound.extend(self.begin_ready());
        }

        Ok(Admission {
            participant,
            outbound,
        })
    }

    fn begin_ready(&mut self) -> Vec<Outbound> {
        self.state = RoomState::Ready;
        let start = self.config.countdown_start();
        self.countdown = Some(start);
        tracing::info!(
            room_id = %self.id,
            ready_up_secs = self.config.ready_up_time,
            countdown_from = start,
            "room full, ready-up started"
        );
        vec![Outbound::to(Recipient::All, ServerEvent::ReadyUp)]
    }

    /// Removes a participant. The state never changes on removal.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if `id` is not an occupant.
    pub fn remove(&mut self, id: ParticipantId) -> Result<Vec<Outbound>, RoomError> {
        let index = self
            .participants
            .iter()
            .position(|p| p.player_id == id)
            .ok_or(RoomError::NotInRoom(id, self.id))?;
        self.participants.remove(index);

        tracing::info!(
            room_id = %self.id,
            participant_id = %id,
            occupants = self.participants.len(),
            state = %self.state,
            "participant removed"
        );

        Ok(vec![Outbound::to(
            Recipient::AllExcept(id),
            ServerEvent::DisconnectPlayer {
                player_id: id,
                room_size: self.participants.len(),
            },
        )])
    }

    /// Applies one movement report.
    ///
    /// Ignored during Prep or for an unknown participant. Otherwise the
    /// tracked position is updated, the report is relayed, and the goal
    /// check runs against the *reported* `py`.
    pub fn apply_movement(&mut self, id: ParticipantId, report: MovementReport) -> Vec<Outbound> {
        if !self.state.accepts_movement() {
            tracing::trace!(room_id = %self.id, participant_id = %id, "movement frozen, ignoring");
            return Vec::new();
        }
        let tracking = self.config.position_tracking;
        let Some(participant) = self.participants.iter_mut().find(|p| p.player_id == id) else {
            tracing::debug!(
                room_id = %self.id,
                participant_id = %id,
                "movement from non-member, ignoring"
            );
            return Vec::new();
        };

        match tracking {
            PositionTracking::Accumulate => {
                participant.x += report.px + report.vx;
                participant.y += report.py + report.vy;
            }
            PositionTracking::Overwrite => {
                participant.x = report.px;
                participant.y = report.py;
            }
        }
        participant.vx = report.vx;
        participant.vy = report.vy;
        let friendly_name = participant.friendly_name;

        let relay = report.stamped(id);
        let mut outbound = if report.py >= self.config.below_world {
            vec![Outbound::to(Recipient::All, ServerEvent::ResetPlayer(relay))]
        } else {
            vec![Outbound::to(Recipient::AllExcept(id), ServerEvent::PlayerMoved(relay))]
        };

        if self.state == RoomState::Running && report.py <= self.config.goal_location {
            self.state = RoomState::End;
            self.winner = Some(id);
            tracing::info!(
                room_id = %self.id,
                participant_id = %id,
                friendly_name,
                "goal reached, match over"
            );
            outbound.push(Outbound::to(Recipient::All, ServerEvent::GameOver(friendly_name)));
        }

        outbound
    }

    /// Advances the countdown by `elapsed` seconds.
    ///
    /// Thresholds are range checks, so a tick that covers several seconds
    /// still passes through every phase, each at most once. Order within a
    /// tick: Ready→Countdown, Countdown→Prep (`prep`), `currentCountdown`,
    /// Prep→Running (`startGame`).
    pub fn countdown_tick(&mut self, elapsed: u64) -> Vec<Outbound> {
        let Some(count) = self.countdown else {
            return Vec::new();
        };
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let count = count.saturating_sub(elapsed);
        self.countdown = Some(count);

        let mut outbound = Vec::new();

        if self.state == RoomState::Ready && count <= self.config.countdown_time {
            self.state = RoomState::Countdown;
            tracing::debug!(room_id = %self.id, count, "countdown started");
        }

        if self.state == RoomState::Countdown && count <= self.config.prepare_time {
            self.state = RoomState::Prep;
            tracing::debug!(room_id = %self.id, count, "prep, movement frozen");
            outbound.push(Outbound::to(Recipient::All, ServerEvent::Prep));
        }

        if count > 0 && count <= self.config.countdown_time {
            tracing::debug!(room_id = %self.id, count, "game starting soon");
            outbound.push(Outbound::to(Recipient::All, ServerEvent::CurrentCountdown(count)));
        }

        if count == 0 {
            self.countdown = None;
            self.state = RoomState::Running;
            tracing::info!(
                room_id = %self.id,
                occupants = self.participants.len(),
                "match started"
            );
            outbound.push(Outbound::to(Recipient::All, ServerEvent::StartGame));
        }

        outbound
    }
}
