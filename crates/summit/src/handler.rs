//! Per-connection handler: room placement, event delivery, and inbound
//! routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Place the connection in a room through the gateway
//!   2. Spawn a writer task draining the room's events onto the socket
//!   3. Loop: receive frames → decode → dispatch to the room
//!   4. On close or error, leave the room

use std::sync::Arc;

use summit_protocol::{ClientEvent, Codec, ServerEvent};
use summit_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::SummitError;

/// Drop guard that takes the connection out of its room when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct RoomGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for RoomGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.gateway.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SummitError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");
    let conn = Arc::new(conn);

    // --- Step 1: Placement ---
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    if let Err(e) = state.gateway.connect(conn_id, events_tx).await {
        tracing::warn!(%conn_id, error = %e, "could not place connection, closing");
        let _ = conn.close().await;
        return Err(e);
    }
    let _guard = RoomGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 2: Delivery ---
    let writer = tokio::spawn(write_events(
        Arc::clone(&conn),
        Arc::clone(&state),
        events_rx,
    ));

    // --- Step 3: Inbound loop ---
    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        match state.gateway.dispatch(conn_id, event).await {
            Ok(()) => {}
            Err(SummitError::Protocol(e)) => {
                tracing::debug!(%conn_id, error = %e, "dropping invalid event");
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "event not delivered");
            }
        }
    }

    writer.abort();
    // _guard drops here → the room hears about the departure.
    Ok(())
}

/// Encodes room events and writes them to the socket until the room drops
/// its sender or the socket fails.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();
    while let Some(event) = events.recv().await {
        let frame = match state.codec.encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%conn_id, event = event.name(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
