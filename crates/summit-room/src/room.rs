//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Admission, removal, movement, queries, and countdown ticks all arrive
//! through the actor's loop, so they are applied one at a time and never
//! race on the roster. Delivery is a non-blocking push onto each
//! participant's unbounded channel; the connection task owning the other
//! end does the network I/O.
//!
//! The actor also publishes a [`RoomInfo`] on a watch channel whenever its
//! state or occupancy changes, so the directory can skip busy rooms
//! without a round-trip.

use std::collections::HashMap;
use std::time::Duration;

use summit_protocol::{MovementReport, Participant, ParticipantId, RoomId, ServerEvent};
use summit_tick::TickScheduler;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{MatchConfig, Outbound, Room, RoomError, RoomState};

/// Channel sender delivering a room's events to one participant.
pub type ParticipantSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Admit {
        participant_id: ParticipantId,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<Participant, RoomError>>,
    },
    Remove {
        participant_id: ParticipantId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Movement {
        participant_id: ParticipantId,
        report: MovementReport,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Roster {
        reply: oneshot::Sender<Vec<Participant>>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    pub participant_count: usize,
    pub capacity: usize,
}

impl RoomInfo {
    /// Whether the directory may route a newcomer here.
    pub fn has_open_slot(&self) -> bool {
        self.state.is_joinable() && self.participant_count < self.capacity
    }
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    status: watch::Receiver<RoomInfo>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Admits a participant whose events go to `sender`.
    pub async fn admit(
        &self,
        participant_id: ParticipantId,
        sender: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        self.request(|reply| RoomCommand::Admit {
            participant_id,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a participant and stops delivering to them.
    pub async fn remove(&self, participant_id: ParticipantId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Remove {
            participant_id,
            reply,
        })
        .await?
    }

    /// Forwards a movement report (fire-and-forget).
    pub async fn apply_movement(
        &self,
        participant_id: ParticipantId,
        report: MovementReport,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Movement {
                participant_id,
                report,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// The last state and occupancy the actor published.
    ///
    /// Admissions and removals publish before they reply, so this is
    /// current for whoever serializes them.
    pub fn status(&self) -> RoomInfo {
        self.status.borrow().clone()
    }

    /// Asks the actor directly.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Current occupants in admission order.
    pub async fn roster(&self) -> Result<Vec<Participant>, RoomError> {
        self.request(|reply| RoomCommand::Roster { reply }).await
    }

    pub async fn is_player_present(
        &self,
        participant_id: ParticipantId,
    ) -> Result<bool, RoomError> {
        let roster = self.roster().await?;
        Ok(roster.iter().any(|p| p.player_id == participant_id))
    }

    /// Tells the room to stop. Its countdown, if any, dies with it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The task-side state of a room.
struct RoomActor {
    room: Room,
    senders: HashMap<ParticipantId, ParticipantSender>,
    countdown: TickScheduler,
    end_grace: Duration,
    /// Set when the room reaches End; the actor stops at this instant.
    retire_at: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
    status: watch::Sender<RoomInfo>,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.id();
        tracing::info!(%room_id, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!(%room_id, "all room handles dropped");
                        break;
                    };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                tick = self.countdown.wait_for_tick() => {
                    let out = self.room.countdown_tick(tick.elapsed_ticks());
                    self.dispatch(out);
                }
                _ = sleep_until_opt(self.retire_at) => {
                    tracing::info!(%room_id, "finished room retired");
                    break;
                }
            }

            self.sync_timers();
            self.publish();
            if self.room.is_empty() && !self.room.state().is_joinable() {
                tracing::info!(
                    %room_id,
                    state = %self.room.state(),
                    "room emptied mid-match, closing"
                );
                break;
            }
        }

        if self.countdown.is_armed() {
            tracing::warn!(
                %room_id,
                remaining = ?self.room.countdown(),
                "room stopped with countdown live, countdown abandoned"
            );
            self.countdown.disarm();
        }
        tracing::info!(%room_id, state = %self.room.state(), "room actor stopped");
    }

    /// Applies one command. Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Admit {
                participant_id,
                sender,
                reply,
            } => {
                let result = self.handle_admit(participant_id, sender);
                self.publish();
                let _ = reply.send(result);
            }
            RoomCommand::Remove {
                participant_id,
                reply,
            } => {
                let result = self.room.remove(participant_id).map(|out| {
                    self.senders.remove(&participant_id);
                    self.dispatch(out);
                });
                self.publish();
                let _ = reply.send(result);
            }
            RoomCommand::Movement {
                participant_id,
                report,
            } => {
                let out = self.room.apply_movement(participant_id, report);
                self.dispatch(out);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Roster { reply } => {
                let _ = reply.send(self.room.roster().to_vec());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room.id(), "room shutting down");
                return false;
            }
        }
        true
    }

    fn handle_admit(
        &mut self,
        participant_id: ParticipantId,
        sender: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        match self.room.admit(participant_id) {
            Ok(admission) => {
                self.senders.insert(participant_id, sender);
                self.dispatch(admission.outbound);
                Ok(admission.participant)
            }
            Err(e) => {
                if matches!(e, RoomError::RoomFull(_)) {
                    tracing::error!(
                        room_id = %self.room.id(),
                        %participant_id,
                        "admission into a full room rejected"
                    );
                }
                Err(e)
            }
        }
    }

    /// Arms the countdown while the room is counting down and schedules
    /// retirement once the match is over.
    fn sync_timers(&mut self) {
        let state = self.room.state();
        if state.is_counting_down() && !self.countdown.is_armed() {
            self.countdown.arm();
        } else if !state.is_counting_down() && self.countdown.is_armed() {
            self.countdown.disarm();
        }

        if state == RoomState::End && self.retire_at.is_none() {
            self.retire_at = Some(Instant::now() + self.end_grace);
        }
    }

    /// Delivers events to their recipients. Never blocks; a closed
    /// receiver just means that connection is on its way out.
    fn dispatch(&self, out: Vec<Outbound>) {
        for Outbound { recipient, event } in out {
            for (pid, sender) in &self.senders {
                if recipient.includes(*pid) {
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    fn publish(&self) {
        let info = self.info();
        self.status.send_if_modified(|current| {
            if *current == info {
                return false;
            }
            *current = info;
            true
        });
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.id(),
            state: self.room.state(),
            participant_count: self.room.len(),
            capacity: self.room.capacity(),
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawns a room actor and returns a handle to it.
///
/// `channel_size` bounds the command queue.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: MatchConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let countdown = TickScheduler::new(config.tick.clone());
    let end_grace = config.end_grace;
    let room = Room::new(room_id, config);
    let (status_tx, status_rx) = watch::channel(RoomInfo {
        room_id,
        state: room.state(),
        participant_count: 0,
        capacity: room.capacity(),
    });

    let actor = RoomActor {
        countdown,
        end_grace,
        room,
        senders: HashMap::new(),
        retire_at: None,
        receiver: rx,
        status: status_tx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        status: status_rx,
    }
}
