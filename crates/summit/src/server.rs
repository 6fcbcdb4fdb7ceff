//! `SummitServer` builder and accept loop.
//!
//! This is the entry point for hosting races. It ties the layers together:
//! transport → protocol → gateway → rooms.

use std::sync::Arc;
use std::time::Duration;

use summit_protocol::{Codec, JsonCodec};
use summit_room::MatchConfig;
use summit_transport::{DEFAULT_HANDSHAKE_TIMEOUT, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Gateway, SummitError};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Summit server.
///
/// # Example
///
/// ```rust,ignore
/// use summit::prelude::*;
///
/// let server = SummitServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .match_config(MatchConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct SummitServerBuilder {
    bind_addr: String,
    match_config: MatchConfig,
    handshake_timeout: Duration,
}

impl SummitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            match_config: MatchConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// How long a new peer gets to finish the WebSocket upgrade before it
    /// is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener. Frames are JSON over WebSocket.
    pub async fn build(self) -> Result<SummitServer<JsonCodec>, SummitError> {
        let transport =
            WebSocketTransport::bind_with_timeout(&self.bind_addr, self.handshake_timeout).await?;

        let state = Arc::new(ServerState {
            gateway: Arc::new(Gateway::new(self.match_config)),
            codec: JsonCodec,
        });

        Ok(SummitServer { transport, state })
    }
}

impl Default for SummitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Summit server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SummitServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> SummitServer<C> {
    /// Creates a new builder.
    pub fn builder() -> SummitServerBuilder {
        SummitServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The gateway shared by every connection, for occupancy queries.
    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.state.gateway)
    }

    /// Runs the accept loop.
    ///
    /// Connections arrive already upgraded; each gets its own handler task.
    /// Runs until the process is terminated or the listener stops.
    pub async fn run(mut self) -> Result<(), SummitError> {
        tracing::info!("Summit server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "listener stopped");
                    return Err(e.into());
                }
            }
        }
    }
}
