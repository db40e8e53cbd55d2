//! WebSocket route handler
//!
//! Each connection runs its own loop: push a fresh market summary, wait for
//! the push interval, repeat. Registry broadcasts are forwarded in between.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::AppState;

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    debug!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection until it closes
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, mut broadcasts) = state.connections.register();
    info!("New WebSocket connection: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut ticker = tokio::time::interval(state.ws_push_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = match state.fetcher.get_market_summary().await {
                    Ok(summary) => summary,
                    Err(e) => {
                        error!("Failed to build summary for {}: {}", client_id, e);
                        break;
                    }
                };
                let json = match serde_json::to_string(&summary) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize summary: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Some(message) = broadcasts.recv() => {
                if sender.send(Message::Text(message.to_string().into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Client frames carry nothing; pings are answered by axum
                Some(Ok(_)) => {}
            },
        }
    }

    state.connections.deregister(client_id);
    info!("WebSocket connection closed: {}", client_id);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, Stream, StreamExt};
    use rust_decimal_macros::dec;
    use ticker_core::StaticProvider;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;

    use crate::routes::router;
    use crate::routes::test_support::{get, state};

    async fn next_json<S>(socket: &mut S) -> serde_json::Value
    where
        S: Stream<Item = Result<ClientMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no frame within timeout")
            .unwrap()
            .unwrap();
        serde_json::from_str(message.to_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_ws_pushes_summary_forwards_broadcasts_and_deregisters() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(StaticProvider::new(), &["AAPL", "MSFT"], dir.path());
        state
            .storage
            .insert_observation("AAPL", dec!(190.25), Some(100), None, None)
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        // Summary is pushed right after connecting
        let pushed = next_json(&mut socket).await;
        assert_eq!(pushed["total_stocks"], 1);
        assert_eq!(pushed["stocks"][0]["symbol"], "AAPL");
        assert_eq!(pushed["stocks"][0]["price"], 190.25);
        assert_eq!(state.connections.len(), 1);

        let (_, body) = get(router(state.clone()), "/api/market-summary").await;
        let rest: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(pushed["stocks"], rest["stocks"]);
        assert_eq!(pushed["total_stocks"], rest["total_stocks"]);

        assert_eq!(state.connections.broadcast(r#"{"kind":"refresh"}"#), 1);
        let forwarded = next_json(&mut socket).await;
        assert_eq!(forwarded["kind"], "refresh");

        socket.send(ClientMessage::Close(None)).await.unwrap();

        let deregistered = tokio::time::timeout(Duration::from_secs(5), async {
            while !state.connections.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(deregistered.is_ok());
        assert_eq!(state.connections.len(), 0);
    }
}
