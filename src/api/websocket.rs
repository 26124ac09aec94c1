//! WebSocket bed board stream.
//!
//! Each connection subscribes to the synchronizer and forwards every snapshot
//! as a `BedSnapshot` message. A `Heartbeat` goes out every 30s. The
//! subscription ends when the client closes or the socket errors.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws/beds`
//! 2. Server sends the current snapshot
//! 3. Server sends a fresh snapshot after every bed change
//! 4. Client `Close` (or disconnect) unsubscribes

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::types::ApiContext;
use crate::core_state::CoreState;
use crate::models::BedView;

/// Heartbeat interval: server sends Heartbeat every 30 seconds.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Server → dashboard WebSocket messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutgoing {
    /// Full bed board, replacing whatever the client holds.
    BedSnapshot { beds: Vec<BedView>, sent_at: String },
    Heartbeat { server_time: String },
}

/// `GET /ws/beds`: upgrade to the bed board stream.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(ctx): State<ApiContext>) -> impl IntoResponse {
    tracing::info!("Bed board WebSocket upgrade accepted");
    let core = ctx.core.clone();
    ws.on_upgrade(move |socket| handle_ws(socket, core))
}

async fn handle_ws(socket: WebSocket, core: Arc<CoreState>) {
    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<WsOutgoing>();

    // Spawn sender task (reads from channel, writes to WebSocket)
    let sender_handle = tokio::spawn(async move {
        let mut sink = ws_sink;
        let mut rx = rx;
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(_) => continue,
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let snapshot_tx = tx.clone();
    let subscription = core.synchronizer().subscribe(move |beds| {
        let _ = snapshot_tx.send(WsOutgoing::BedSnapshot {
            beds,
            sent_at: chrono::Utc::now().to_rfc3339(),
        });
    });

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // Consume initial immediate tick

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // Dashboards only listen
                }
            }
            _ = heartbeat.tick() => {
                if tx.send(WsOutgoing::Heartbeat {
                    server_time: chrono::Utc::now().to_rfc3339(),
                }).is_err() {
                    break;
                }
            }
        }
    }

    // Cleanup: dropping the handle unsubscribes and releases the snapshot sender,
    // then dropping `tx` lets the sender task drain and stop
    drop(subscription);
    drop(tx);
    let _ = sender_handle.await;

    tracing::info!("Bed board WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router::api_router;
    use crate::core_state::tests::test_core;
    use crate::models::AssignRequest;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite;

    async fn setup_ws_server() -> (String, Arc<CoreState>, tokio::task::JoinHandle<()>) {
        let core = test_core();
        let app = api_router(core.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("ws://127.0.0.1:{}/ws/beds", addr.port());
        (url, core, handle)
    }

    async fn next_json<S>(ws: &mut S) -> serde_json::Value
    where
        S: futures_util::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
    {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended")
            .expect("WS error");
        let text = msg.into_text().expect("not text");
        serde_json::from_str(&text).unwrap()
    }

    fn bed_occupied(msg: &serde_json::Value, bed_id: &str) -> bool {
        msg["beds"]
            .as_array()
            .into_iter()
            .flatten()
            .any(|b| b["bed_id"] == bed_id && b["is_occupied"] == true)
    }

    #[tokio::test]
    async fn ws_connect_receives_initial_snapshot() {
        let (url, _core, server) = setup_ws_server().await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("WS connect failed");

        let parsed = next_json(&mut ws).await;
        assert_eq!(parsed["type"], "BedSnapshot");
        assert_eq!(parsed["beds"].as_array().unwrap().len(), 3);
        assert!(parsed["sent_at"].is_string());

        let _ = ws.close(None).await;
        server.abort();
    }

    #[tokio::test]
    async fn ws_pushes_snapshot_after_assign() {
        let (url, core, server) = setup_ws_server().await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("WS connect failed");
        let initial = next_json(&mut ws).await;
        assert!(!bed_occupied(&initial, "B1"));

        core.assignments()
            .assign(&AssignRequest {
                bed_id: "B1".into(),
                patient_id: "P1".into(),
                ..Default::default()
            })
            .unwrap();

        let update = next_json(&mut ws).await;
        assert_eq!(update["type"], "BedSnapshot");
        assert!(bed_occupied(&update, "B1"));
        let b1 = update["beds"]
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["bed_id"] == "B1")
            .unwrap();
        assert_eq!(b1["occupant"]["patient_name"], "Ada Park");

        let _ = ws.close(None).await;
        server.abort();
    }

    async fn wait_for_subscribers(core: &CoreState, want: usize) {
        let settled = tokio::time::timeout(Duration::from_secs(5), async {
            while core.store().feed_subscribers() != want {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(settled.is_ok(), "expected {want} live subscriptions");
    }

    #[tokio::test]
    async fn ws_close_ends_the_subscription() {
        let (url, core, server) = setup_ws_server().await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("WS connect failed");
        next_json(&mut ws).await;
        assert_eq!(core.store().feed_subscribers(), 1);

        let _ = ws.close(None).await;
        wait_for_subscribers(&core, 0).await;

        core.assignments()
            .assign(&AssignRequest {
                bed_id: "B1".into(),
                patient_id: "P1".into(),
                ..Default::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(core.store().feed_subscribers(), 0);

        server.abort();
    }

    #[tokio::test]
    async fn ws_disconnect_without_close_ends_the_subscription() {
        let (url, core, server) = setup_ws_server().await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("WS connect failed");
        next_json(&mut ws).await;
        drop(ws);
        wait_for_subscribers(&core, 0).await;
        server.abort();
    }

    #[test]
    fn outgoing_messages_are_type_tagged() {
        let heartbeat = WsOutgoing::Heartbeat {
            server_time: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&heartbeat).unwrap();
        assert_eq!(json["type"], "Heartbeat");

        let snapshot = WsOutgoing::BedSnapshot {
            beds: Vec::new(),
            sent_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["type"], "BedSnapshot");
        assert!(json["beds"].as_array().unwrap().is_empty());
    }
}
