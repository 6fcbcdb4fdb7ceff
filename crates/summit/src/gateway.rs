//! Connection gateway: binds connections to rooms and routes their events.

use std::collections::HashMap;

use summit_protocol::{ClientEvent, MovementReport, Participant, ParticipantId, PlayerCount};
use summit_room::{MatchConfig, ParticipantSender, RoomDirectory, RoomHandle};
use summit_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::SummitError;

/// Which room a connection was placed in.
struct Binding {
    participant_id: ParticipantId,
    room: RoomHandle,
}

/// Shared by every connection task.
///
/// The directory is only locked while a room is picked or released. After
/// that each connection talks to its room through its own cloned handle,
/// so movement never contends on the directory.
pub struct Gateway {
    directory: Mutex<RoomDirectory>,
    bindings: Mutex<HashMap<ConnectionId, Binding>>,
}

impl Gateway {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            directory: Mutex::new(RoomDirectory::new(config)),
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Places a new connection in a room. Room events for it go to `sender`.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        sender: ParticipantSender,
    ) -> Result<Participant, SummitError> {
        let participant_id = ParticipantId::from(conn_id);
        let assignment = {
            let mut directory = self.directory.lock().await;
            directory.assign_room(participant_id, sender).await?
        };

        tracing::info!(
            %conn_id,
            room_id = %assignment.room.room_id(),
            friendly_name = assignment.participant.friendly_name,
            "connection joined room"
        );

        self.bindings.lock().await.insert(
            conn_id,
            Binding {
                participant_id,
                room: assignment.room,
            },
        );
        Ok(assignment.participant)
    }

    /// Routes one decoded client event.
    pub async fn dispatch(
        &self,
        conn_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SummitError> {
        match event {
            ClientEvent::PlayerMovement(report) => self.movement(conn_id, report).await,
        }
    }

    /// Validates a movement report and forwards it to the connection's room.
    ///
    /// # Errors
    /// - `SummitError::Protocol` if a coordinate is not finite.
    /// - `SummitError::Unbound` if the connection is not in a room.
    pub async fn movement(
        &self,
        conn_id: ConnectionId,
        report: MovementReport,
    ) -> Result<(), SummitError> {
        report.validate()?;

        let (participant_id, room) = {
            let bindings = self.bindings.lock().await;
            let binding = bindings.get(&conn_id).ok_or(SummitError::Unbound(conn_id))?;
            (binding.participant_id, binding.room.clone())
        };
        room.apply_movement(participant_id, report).await?;
        Ok(())
    }

    /// Takes a connection out of its room. Returns `false` if it was not
    /// in one.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> bool {
        let Some(binding) = self.bindings.lock().await.remove(&conn_id) else {
            return false;
        };

        if let Err(e) = binding.room.remove(binding.participant_id).await {
            // The room already stopped; nobody is left to notify.
            tracing::debug!(%conn_id, error = %e, "room gone before disconnect");
        }
        self.directory.lock().await.release(binding.participant_id);

        tracing::info!(%conn_id, room_id = %binding.room.room_id(), "connection left room");
        true
    }

    /// Occupancy of the newest room against capacity.
    pub async fn player_count(&self) -> PlayerCount {
        self.directory.lock().await.player_count()
    }

    /// Live rooms after dropping the ones whose actor stopped.
    pub async fn room_count(&self) -> usize {
        let mut directory = self.directory.lock().await;
        directory.prune();
        directory.room_count()
    }

    /// Connections currently bound to a room.
    pub async fn connection_count(&self) -> usize {
        self.bindings.lock().await.len()
    }
}
