//! Room directory: routes newcomers to a room with a free slot.

use std::collections::{BTreeMap, HashMap};

use summit_protocol::{Participant, ParticipantId, PlayerCount, RoomId};

use crate::room::spawn_room;
use crate::{MatchConfig, ParticipantSender, RoomError, RoomHandle, RoomInfo};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Where a newcomer ended up.
#[derive(Clone)]
pub struct Assignment {
    pub room: RoomHandle,
    pub participant: Participant,
}

/// Owns every live room and knows which participant is in which.
///
/// Rooms are scanned in creation order; a new room is created only when
/// none of them is Waiting with a free slot.
pub struct RoomDirectory {
    config: MatchConfig,
    /// Keyed by id, so iteration order is creation order.
    rooms: BTreeMap<RoomId, RoomHandle>,
    /// A participant is in at most one room.
    membership: HashMap<ParticipantId, RoomId>,
    next_room_id: u64,
}

impl RoomDirectory {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config: config.validated(),
            rooms: BTreeMap::new(),
            membership: HashMap::new(),
            next_room_id: 1,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Spawns a new room actor.
    pub fn create_room(&mut self) -> RoomHandle {
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        let handle = spawn_room(room_id, self.config.clone(), DEFAULT_CHANNEL_SIZE);
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, capacity = self.config.capacity, "room created");
        handle
    }

    /// Admits a participant into the first open room, creating one if
    /// every room is full or already racing.
    ///
    /// Rooms are filtered on their published status, so a room that is
    /// full or racing costs no round-trip. A candidate can still refuse
    /// (its actor stopped), and the scan then moves on.
    pub async fn assign_room(
        &mut self,
        participant_id: ParticipantId,
        sender: ParticipantSender,
    ) -> Result<Assignment, RoomError> {
        if let Some(room_id) = self.membership.get(&participant_id) {
            return Err(RoomError::AlreadyInRoom(participant_id, *room_id));
        }
        self.prune();

        for handle in self.rooms.values() {
            if !handle.status().has_open_slot() {
                continue;
            }
            match handle.admit(participant_id, sender.clone()).await {
                Ok(participant) => {
                    let room = handle.clone();
                    self.membership.insert(participant_id, handle.room_id());
                    return Ok(Assignment { room, participant });
                }
                Err(e) => {
                    tracing::debug!(
                        room_id = %handle.room_id(),
                        %participant_id,
                        error = %e,
                        "room refused admission, trying next"
                    );
                }
            }
        }

        let room = self.create_room();
        let participant = room.admit(participant_id, sender).await?;
        self.membership.insert(participant_id, room.room_id());
        Ok(Assignment { room, participant })
    }

    /// The room a participant is in, if any.
    pub fn find_room_of(&self, participant_id: ParticipantId) -> Option<RoomId> {
        self.membership.get(&participant_id).copied()
    }

    /// Forgets a participant's membership without touching the room.
    /// Used after the caller already removed them through its own handle.
    pub fn release(&mut self, participant_id: ParticipantId) -> Option<RoomId> {
        self.membership.remove(&participant_id)
    }

    /// Removes a participant from whatever room holds them.
    pub async fn remove_participant(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(), RoomError> {
        let room_id = self
            .membership
            .remove(&participant_id)
            .ok_or(RoomError::Unassigned(participant_id))?;
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.remove(participant_id).await
    }

    pub fn room(&self, room_id: RoomId) -> Option<&RoomHandle> {
        self.rooms.get(&room_id)
    }

    pub async fn room_info(&self, room_id: RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.info().await
    }

    /// Occupancy of the newest room against capacity.
    pub fn player_count(&self) -> PlayerCount {
        let current = self
            .rooms
            .values()
            .next_back()
            .filter(|handle| !handle.is_closed())
            .map_or(0, |handle| handle.status().participant_count);
        PlayerCount {
            current,
            total: self.config.capacity,
        }
    }

    /// Drops rooms whose actor has stopped, and the memberships that
    /// pointed at them.
    pub fn prune(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|room_id, handle| {
            let closed = handle.is_closed();
            if closed {
                tracing::debug!(%room_id, "pruning stopped room");
            }
            !closed
        });
        let rooms = &self.rooms;
        self.membership.retain(|_, room_id| rooms.contains_key(room_id));
        before - self.rooms.len()
    }

    /// Shuts down a room and forgets everyone in it.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self.rooms.remove(&room_id).ok_or(RoomError::NotFound(room_id))?;
        let _ = handle.shutdown().await;
        self.membership.retain(|_, rid| *rid != room_id);
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Cloned handles to every room, in creation order.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }
}
