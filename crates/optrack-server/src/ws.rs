//! WebSocket fan-out of pipeline events.
//!
//! Every subscriber gets its own broadcast receiver; a slow or dead
//! subscriber only loses its own messages and never stalls the pipeline.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn ws_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_stream_socket(socket, state))
}

async fn handle_stream_socket(socket: WebSocket, state: AppState) {
    let active = state.connection_opened();
    info!(active, "WebSocket subscriber connected");

    let mut events = state.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(message) => {
                    let payload = match serde_json::to_string(&message) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Skip ahead; frames are ephemeral and the next report
                    // carries full state anyway.
                    warn!(skipped, "Subscriber lagged, dropping events");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {
                    // Inbound payloads are ignored; the stream is one-way.
                }
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    let active = state.connection_closed();
    info!(active, "WebSocket subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use optrack_models::StreamMessage;
    use tokio::sync::broadcast::error::TryRecvError;

    use crate::config::ServerConfig;
    use crate::state::AppState;

    fn test_state() -> AppState {
        AppState::new(ServerConfig::from_env().unwrap())
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_affect_others() {
        let state = test_state();
        let mut kept = state.subscribe();
        let dropped = state.subscribe();
        drop(dropped);

        state.events().send(StreamMessage::frame("AA==")).unwrap();
        assert!(matches!(
            kept.recv().await.unwrap(),
            StreamMessage::Frame { .. }
        ));

        // The channel keeps delivering after the disconnect.
        state.events().send(StreamMessage::error("detector down")).unwrap();
        assert!(matches!(
            kept.recv().await.unwrap(),
            StreamMessage::Error { .. }
        ));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_only_subsequent_events() {
        let state = test_state();
        let mut early = state.subscribe();

        state.events().send(StreamMessage::frame("AA==")).unwrap();
        let mut late = state.subscribe();
        state.events().send(StreamMessage::error("tick")).unwrap();

        assert!(matches!(
            early.recv().await.unwrap(),
            StreamMessage::Frame { .. }
        ));
        assert!(matches!(
            early.recv().await.unwrap(),
            StreamMessage::Error { .. }
        ));

        // The late subscriber never sees the frame sent before it joined.
        assert!(matches!(
            late.recv().await.unwrap(),
            StreamMessage::Error { .. }
        ));
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }
}
