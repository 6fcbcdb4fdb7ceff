mod config;

use summit::prelude::*;

use crate::config::HostConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HostConfig::from_env()?;
    init_tracing(&config.log_filter);

    tracing::info!(
        addr = %config.addr,
        capacity = config.match_config.capacity,
        countdown_secs = config.match_config.countdown_time,
        "starting summit host"
    );

    let server = SummitServerBuilder::new()
        .bind(&config.addr.to_string())
        .match_config(config.match_config)
        .build()
        .await?;

    if !config.status_interval.is_zero() {
        let gateway = server.gateway();
        let every = config.status_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let count = gateway.player_count().await;
                let rooms = gateway.room_count().await;
                tracing::info!(
                    current = count.current,
                    total = count.total,
                    rooms = rooms,
                    "occupancy"
                );
            }
        });
    }

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn next_name(ws: &mut ClientWs) -> String {
        let msg = ws.next().await.unwrap().unwrap();
        let event: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        event["event"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_host_places_client_and_relays_movement() {
        let server = SummitServerBuilder::new()
            .bind("127.0.0.1:0")
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (mut a, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        a.next().await.unwrap().unwrap();
        let (mut b, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();

        let mut names = Vec::new();
        names.push(next_name(&mut b).await);

        let frame = r#"{"event":"playerMovement","data":{"px":1.0,"py":2.0,"vx":0.0,"vy":0.0}}"#;
        a.send(Message::Text(frame.into())).await.unwrap();
        names.push(next_name(&mut b).await);

        assert_eq!(names, vec!["currentPlayers", "playerMoved"]);
    }
}
