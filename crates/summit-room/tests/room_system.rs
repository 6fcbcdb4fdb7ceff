//! Integration tests for room actors and the room directory.
//!
//! Time is paused, so the one-second countdown runs instantly and
//! deterministically.

use std::time::Duration;

use summit_protocol::{MovementReport, ParticipantId, RoomId, ServerEvent};
use summit_room::{
    JoinOrderPolicy, MatchConfig, ParticipantSender, RoomDirectory, RoomError, RoomState,
};
use tokio::sync::mpsc;

fn pid(id: u64) -> ParticipantId {
    ParticipantId(id)
}

fn channel() -> (ParticipantSender, mpsc::UnboundedReceiver<ServerEvent>) {
    mpsc::unbounded_channel()
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn climb(py: f64) -> MovementReport {
    MovementReport {
        px: 300.0,
        py,
        vx: 0.0,
        vy: -4.0,
    }
}

/// Long enough for a full ready-up and countdown, jitter included.
const WHOLE_COUNTDOWN: Duration = Duration::from_secs(17);

// =========================================================================
// Full match
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_full_room_races_to_first_goal() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, mut rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    let (tx_c, mut rx_c) = channel();

    let a = directory.assign_room(pid(1), tx_a).await.unwrap();
    let b = directory.assign_room(pid(2), tx_b).await.unwrap();
    let c = directory.assign_room(pid(3), tx_c).await.unwrap();

    assert_eq!(a.room.room_id(), b.room.room_id());
    assert_eq!(b.room.room_id(), c.room.room_id());
    assert_eq!(a.participant.friendly_name, 1);
    assert_eq!(c.participant.friendly_name, 3);

    let room = a.room.clone();
    assert_eq!(room.info().await.unwrap().state, RoomState::Ready);

    let joined = drain(&mut rx_a);
    assert!(matches!(&joined[0], ServerEvent::CurrentPlayers(map) if map.len() == 1));
    assert!(matches!(&joined[1], ServerEvent::NewPlayer { room_size: 2, .. }));
    assert!(matches!(&joined[2], ServerEvent::NewPlayer { room_size: 3, .. }));
    assert_eq!(joined[3], ServerEvent::ReadyUp);

    tokio::time::sleep(WHOLE_COUNTDOWN).await;
    assert_eq!(room.info().await.unwrap().state, RoomState::Running);

    let mut expected: Vec<ServerEvent> =
        (4..=10).rev().map(ServerEvent::CurrentCountdown).collect();
    expected.push(ServerEvent::Prep);
    expected.extend((1..=3).rev().map(ServerEvent::CurrentCountdown));
    expected.push(ServerEvent::StartGame);
    assert_eq!(drain(&mut rx_a), expected);

    drain(&mut rx_b);
    drain(&mut rx_c);

    room.apply_movement(pid(1), climb(-1.0)).await.unwrap();
    room.apply_movement(pid(2), climb(-5.0)).await.unwrap();
    assert_eq!(room.info().await.unwrap().state, RoomState::End);

    let seen_by_c = drain(&mut rx_c);
    let game_overs: Vec<_> = seen_by_c
        .iter()
        .filter(|e| matches!(e, ServerEvent::GameOver(_)))
        .collect();
    assert_eq!(game_overs, vec![&ServerEvent::GameOver(1)]);
    assert!(matches!(&seen_by_c[0], ServerEvent::PlayerMoved(m) if m.player_id == pid(1)));

    // The winner hears about their own win but not their own movement.
    assert_eq!(drain(&mut rx_a).first(), Some(&ServerEvent::GameOver(1)));
}

#[tokio::test(start_paused = true)]
async fn test_movement_frozen_during_prep() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, _rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    let (tx_c, _rx_c) = channel();
    let room = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    directory.assign_room(pid(2), tx_b).await.unwrap();
    directory.assign_room(pid(3), tx_c).await.unwrap();

    // Count reaches 3 (prep) after 13 ticks.
    tokio::time::sleep(Duration::from_millis(13_500)).await;
    assert_eq!(room.info().await.unwrap().state, RoomState::Prep);
    drain(&mut rx_b);

    room.apply_movement(pid(1), climb(800.0)).await.unwrap();
    room.info().await.unwrap();
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fall_resets_everyone_including_sender() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, mut rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    let room = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    directory.assign_room(pid(2), tx_b).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);

    room.apply_movement(pid(1), climb(2400.0)).await.unwrap();
    room.info().await.unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        let events = drain(rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerEvent::ResetPlayer(m) if m.player_id == pid(1)));
    }
}

// =========================================================================
// Departures and teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_while_waiting_reuses_occupant_slot() {
    let config = MatchConfig {
        join_order: JoinOrderPolicy::OccupantCount,
        ..MatchConfig::default()
    };
    let mut directory = RoomDirectory::new(config);
    let (tx_a, _rx_a) = channel();
    let (tx_b, mut rx_b) = channel();
    let (tx_c, _rx_c) = channel();

    let room = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    let b = directory.assign_room(pid(2), tx_b).await.unwrap();
    assert_eq!(b.participant.join_order, 1);
    drain(&mut rx_b);

    directory.remove_participant(pid(1)).await.unwrap();
    assert_eq!(
        drain(&mut rx_b),
        vec![ServerEvent::DisconnectPlayer {
            player_id: pid(1),
            room_size: 1,
        }]
    );
    assert_eq!(directory.find_room_of(pid(1)), None);

    let c = directory.assign_room(pid(3), tx_c).await.unwrap();
    assert_eq!(c.room.room_id(), room.room_id());
    assert_eq!(c.participant.join_order, 1);

    let info = room.info().await.unwrap();
    assert_eq!(info.state, RoomState::Waiting);
    assert_eq!(info.participant_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_room_emptied_mid_countdown_closes_without_starting() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, mut rx_a) = channel();
    let (tx_b, _rx_b) = channel();
    let (tx_c, _rx_c) = channel();
    let room = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    directory.assign_room(pid(2), tx_b).await.unwrap();
    directory.assign_room(pid(3), tx_c).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    for id in 1..=3 {
        directory.remove_participant(pid(id)).await.unwrap();
    }
    tokio::time::sleep(WHOLE_COUNTDOWN).await;

    assert!(room.is_closed());
    assert!(!drain(&mut rx_a).contains(&ServerEvent::StartGame));
    assert_eq!(directory.prune(), 1);
    assert_eq!(directory.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_departure_mid_countdown_still_starts() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, mut rx_a) = channel();
    let (tx_b, _rx_b) = channel();
    let (tx_c, mut rx_c) = channel();
    let room = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    directory.assign_room(pid(2), tx_b).await.unwrap();
    directory.assign_room(pid(3), tx_c).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    directory.remove_participant(pid(2)).await.unwrap();
    assert!(!room.status().has_open_slot());

    tokio::time::sleep(WHOLE_COUNTDOWN).await;
    assert!(!room.is_closed());
    assert_eq!(room.info().await.unwrap().state, RoomState::Running);

    let seen_by_a = drain(&mut rx_a);
    assert!(seen_by_a.contains(&ServerEvent::DisconnectPlayer {
        player_id: pid(2),
        room_size: 2,
    }));
    assert_eq!(seen_by_a.last(), Some(&ServerEvent::StartGame));
    assert_eq!(drain(&mut rx_c).last(), Some(&ServerEvent::StartGame));
}

#[tokio::test(start_paused = true)]
async fn test_finished_room_retires_after_grace() {
    let config = MatchConfig {
        capacity: 1,
        end_grace: Duration::from_secs(5),
        ..MatchConfig::default()
    };
    let mut directory = RoomDirectory::new(config);
    let (tx, _rx) = channel();
    let room = directory.assign_room(pid(1), tx).await.unwrap().room;

    tokio::time::sleep(WHOLE_COUNTDOWN).await;
    room.apply_movement(pid(1), climb(0.0)).await.unwrap();
    assert_eq!(room.info().await.unwrap().state, RoomState::End);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!room.is_closed());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(room.is_closed());
    assert!(matches!(room.info().await, Err(RoomError::Unavailable(_))));

    assert_eq!(directory.prune(), 1);
    assert_eq!(directory.find_room_of(pid(1)), None);
}

// =========================================================================
// Directory routing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_overflow_opens_a_new_room() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let mut receivers = Vec::new();
    let mut rooms = Vec::new();
    for id in 1..=4 {
        let (tx, rx) = channel();
        receivers.push(rx);
        rooms.push(directory.assign_room(pid(id), tx).await.unwrap().room.room_id());
    }

    assert_eq!(rooms, vec![RoomId(1), RoomId(1), RoomId(1), RoomId(2)]);
    assert_eq!(directory.room_count(), 2);
    assert_eq!(directory.find_room_of(pid(4)), Some(RoomId(2)));

    let count = directory.player_count();
    assert_eq!((count.current, count.total), (1, 3));
}

#[tokio::test(start_paused = true)]
async fn test_newcomer_skips_room_already_counting_down() {
    let mut directory = RoomDirectory::new(MatchConfig {
        capacity: 2,
        ..MatchConfig::default()
    });
    let (tx_a, _rx_a) = channel();
    let (tx_b, _rx_b) = channel();
    let (tx_c, _rx_c) = channel();
    let first = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    directory.assign_room(pid(2), tx_b).await.unwrap();

    // A departure leaves a free slot, but the room is no longer Waiting.
    directory.remove_participant(pid(2)).await.unwrap();
    let info = first.info().await.unwrap();
    assert_eq!(info.state, RoomState::Ready);
    assert!(!info.has_open_slot());

    let c = directory.assign_room(pid(3), tx_c).await.unwrap();
    assert_ne!(c.room.room_id(), first.room_id());
}

#[tokio::test(start_paused = true)]
async fn test_published_status_follows_the_room() {
    let mut directory = RoomDirectory::new(MatchConfig {
        capacity: 2,
        ..MatchConfig::default()
    });
    let (tx_a, _rx_a) = channel();
    let (tx_b, _rx_b) = channel();
    let (tx_c, _rx_c) = channel();

    let first = directory.assign_room(pid(1), tx_a).await.unwrap().room;
    let status = first.status();
    assert_eq!((status.state, status.participant_count), (RoomState::Waiting, 1));
    assert!(status.has_open_slot());

    directory.assign_room(pid(2), tx_b).await.unwrap();
    let status = first.status();
    assert_eq!((status.state, status.participant_count), (RoomState::Ready, 2));

    // Countdown ticks publish too, not just commands.
    tokio::time::sleep(WHOLE_COUNTDOWN).await;
    assert_eq!(first.status().state, RoomState::Running);
    assert_eq!(first.status(), first.info().await.unwrap());

    let c = directory.assign_room(pid(3), tx_c).await.unwrap();
    assert_eq!(c.room.room_id(), RoomId(2));
    let count = directory.player_count();
    assert_eq!((count.current, count.total), (1, 2));
}

#[tokio::test(start_paused = true)]
async fn test_assign_twice_is_rejected() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx, _rx) = channel();
    directory.assign_room(pid(1), tx.clone()).await.unwrap();

    let err = directory.assign_room(pid(1), tx).await.err().unwrap();
    assert!(matches!(err, RoomError::AlreadyInRoom(p, RoomId(1)) if p == pid(1)));
}

#[tokio::test(start_paused = true)]
async fn test_remove_unassigned_participant() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let err = directory.remove_participant(pid(9)).await.unwrap_err();
    assert!(matches!(err, RoomError::Unassigned(p) if p == pid(9)));
}

#[tokio::test(start_paused = true)]
async fn test_destroy_room_forgets_members() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx, _rx) = channel();
    let room = directory.assign_room(pid(1), tx).await.unwrap().room;

    directory.destroy_room(room.room_id()).await.unwrap();
    assert_eq!(directory.room_count(), 0);
    assert_eq!(directory.find_room_of(pid(1)), None);
    assert!(matches!(
        directory.destroy_room(room.room_id()).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_roster_lists_occupants_in_join_order() {
    let mut directory = RoomDirectory::new(MatchConfig::default());
    let (tx_a, _rx_a) = channel();
    let (tx_b, _rx_b) = channel();
    let room = directory.assign_room(pid(7), tx_a).await.unwrap().room;
    directory.assign_room(pid(3), tx_b).await.unwrap();

    let roster = room.roster().await.unwrap();
    let ids: Vec<_> = roster.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![pid(7), pid(3)]);
    assert!(room.is_player_present(pid(3)).await.unwrap());
    assert!(!room.is_player_present(pid(4)).await.unwrap());
}
