/// WebSocket handler pushing every published snapshot

use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::debug;

use super::routes::AppState;
use crate::core::Snapshot;

pub async fn ws_snapshot_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_snapshot_websocket(socket, state))
}

fn encode(snapshot: &Snapshot) -> Option<Message> {
    serde_json::to_string(snapshot).ok().map(Message::Text)
}

async fn handle_snapshot_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.store.subscribe();

    // Current snapshot first, then one message per publish
    let initial = snapshots.borrow_and_update().clone();
    if let Some(message) = encode(&initial) {
        if sender.send(message).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    // Sender gone, nothing more will be published
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(message) = encode(&snapshot) {
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    debug!("snapshot websocket closed");
}
