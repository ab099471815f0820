//! WebSocket transport for the web chat frontend.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsFrame, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use palaver_core::{ChatModel, Message};
use palaver_session::SessionManager;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};

/// WebSocket handler state.
pub struct WsState<M: ChatModel> {
    /// Session registry shared across sockets.
    pub sessions: Arc<SessionManager<M>>,
}

impl<M: ChatModel> Clone for WsState<M> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler<M: ChatModel + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<WsState<M>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket<M: ChatModel + 'static>(socket: WebSocket, state: WsState<M>) {
    let (mut sender, mut receiver) = socket.split();

    // Channel for sending messages to the client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(WsFrame::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // One conversation per socket; it dies with the connection.
    let session_id = state.sessions.open().await;
    if let Ok(messages) = state.sessions.snapshot(session_id).await {
        let _ = tx.send(ServerMessage::History { messages });
    }

    // Handle incoming messages
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(WsFrame::Text(t)) => t,
            Ok(WsFrame::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Ok(WsFrame::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                break;
            }
        };

        let client_msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid client message: {e}");
                let _ = tx.send(ServerMessage::Error {
                    message: format!("Invalid message: {e}"),
                });
                continue;
            }
        };

        match client_msg {
            ClientMessage::Prompt { text, attachment } => {
                let attachment = match attachment.map(|a| a.decode()).transpose() {
                    Ok(attachment) => attachment,
                    Err(e) => {
                        let _ = tx.send(ServerMessage::Error {
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                match state.sessions.dispatch(session_id, &text, attachment).await {
                    Ok(reply) => {
                        let _ = tx.send(ServerMessage::Turn {
                            user: Message::user(text.trim()),
                            assistant: Message::assistant(reply),
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(ServerMessage::Error {
                            message: e.to_string(),
                        });
                    }
                }
            }
            ClientMessage::Clear => match state.sessions.clear(session_id).await {
                Ok(()) => {
                    let _ = tx.send(ServerMessage::Cleared);
                }
                Err(e) => {
                    let _ = tx.send(ServerMessage::Error {
                        message: e.to_string(),
                    });
                }
            },
            ClientMessage::Ping => {
                let _ = tx.send(ServerMessage::Pong);
            }
        }
    }

    // Cleanup
    state.sessions.close(session_id).await;
    send_task.abort();
    tracing::info!(session = %session_id, "socket disconnected, session destroyed");
}

/// Create the chat WebSocket router.
///
/// # Example
/// ```ignore
/// let app = Router::new()
///     .merge(chat_router(sessions));
/// ```
#[must_use]
pub fn chat_router<M: ChatModel + 'static>(sessions: Arc<SessionManager<M>>) -> axum::Router {
    axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler::<M>))
        .with_state(WsState { sessions })
}
