//! Channel bridge between a terminal UI and its chat session.
//!
//! The UI side stays synchronous and non-blocking; the peer side runs on
//! the async runtime and drives the dispatcher, so a slow remote call
//! never freezes the event loop.

use palaver_core::{ChatModel, Message};
use palaver_session::Dispatcher;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};

/// Send error.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Channel closed")]
    ChannelClosed,
}

/// UI side of the bridge.
pub struct TuiBridge {
    client_tx: mpsc::UnboundedSender<ClientMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TuiBridge {
    /// Create a new bridge.
    ///
    /// Returns the UI side and the peer for the session side.
    #[must_use]
    pub fn new() -> (Self, TuiPeer) {
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        let bridge = Self {
            client_tx,
            server_rx,
        };

        let peer = TuiPeer {
            client_rx,
            server_tx,
        };

        (bridge, peer)
    }

    /// Submit one prompt. The terminal surface never attaches images.
    ///
    /// # Errors
    /// Returns error if the session side is gone.
    pub fn send_prompt<S: Into<String>>(&self, text: S) -> Result<(), SendError> {
        self.client_tx
            .send(ClientMessage::Prompt {
                text: text.into(),
                attachment: None,
            })
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Request a history clear.
    ///
    /// # Errors
    /// Returns error if the session side is gone.
    pub fn send_clear(&self) -> Result<(), SendError> {
        self.client_tx
            .send(ClientMessage::Clear)
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Receive a server message (non-blocking).
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.server_rx.try_recv().ok()
    }
}

/// Session side of the bridge.
pub struct TuiPeer {
    client_rx: mpsc::UnboundedReceiver<ClientMessage>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl TuiPeer {
    /// Drive the dispatcher until the UI side hangs up.
    ///
    /// Sends the history snapshot first, then answers each client message
    /// with the matching server message — one interaction at a time.
    pub async fn run<M: ChatModel>(mut self, mut dispatcher: Dispatcher<M>) {
        let _ = self.server_tx.send(ServerMessage::History {
            messages: dispatcher.snapshot().to_vec(),
        });

        while let Some(msg) = self.client_rx.recv().await {
            match msg {
                ClientMessage::Prompt { text, attachment } => {
                    let attachment = match attachment.map(|a| a.decode()).transpose() {
                        Ok(attachment) => attachment,
                        Err(e) => {
                            let _ = self.server_tx.send(ServerMessage::Error {
                                message: e.to_string(),
                            });
                            continue;
                        }
                    };

                    match dispatcher.send(&text, attachment).await {
                        Ok(reply) => {
                            let _ = self.server_tx.send(ServerMessage::Turn {
                                user: Message::user(text.trim()),
                                assistant: Message::assistant(reply),
                            });
                        }
                        Err(e) => {
                            let _ = self.server_tx.send(ServerMessage::Error {
                                message: e.to_string(),
                            });
                        }
                    }
                }
                ClientMessage::Clear => {
                    dispatcher.clear();
                    let _ = self.server_tx.send(ServerMessage::Cleared);
                }
                ClientMessage::Ping => {
                    let _ = self.server_tx.send(ServerMessage::Pong);
                }
            }
        }

        tracing::debug!("bridge closed, session finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use palaver_core::{ContentPart, ModelChat, ModelError, Role};
    use palaver_session::DispatchMode;
    use std::sync::Arc;
    use uuid::Uuid;

    struct UppercaseModel;

    #[async_trait]
    impl ChatModel for UppercaseModel {
        async fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError> {
            match &parts[0] {
                ContentPart::Text(text) => Ok(text.to_uppercase()),
                ContentPart::InlineImage { .. } => Err(ModelError::MalformedResponse(
                    "unexpected image".to_string(),
                )),
            }
        }

        async fn start_chat(&self) -> Result<Box<dyn ModelChat>, ModelError> {
            Ok(Box::new(UppercaseChat { id: Uuid::new_v4() }))
        }
    }

    struct UppercaseChat {
        id: Uuid,
    }

    #[async_trait]
    impl ModelChat for UppercaseChat {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn send(&mut self, text: &str) -> Result<String, ModelError> {
            Ok(text.to_uppercase())
        }
    }

    fn start_session(mode: DispatchMode) -> TuiBridge {
        let (bridge, peer) = TuiBridge::new();
        let dispatcher = Dispatcher::new(Arc::new(UppercaseModel), mode);
        tokio::spawn(peer.run(dispatcher));
        bridge
    }

    #[tokio::test]
    async fn test_prompt_roundtrip() {
        let mut bridge = start_session(DispatchMode::Chat);

        let first = bridge.server_rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::History { messages } if messages.is_empty()));

        bridge.send_prompt("hello").unwrap();
        let ServerMessage::Turn { user, assistant } = bridge.server_rx.recv().await.unwrap()
        else {
            panic!("expected a turn");
        };
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text, "hello");
        assert_eq!(assistant.text, "HELLO");
    }

    #[tokio::test]
    async fn test_clear_is_acknowledged() {
        let mut bridge = start_session(DispatchMode::Chat);
        let _history = bridge.server_rx.recv().await.unwrap();

        bridge.send_prompt("hello").unwrap();
        let _turn = bridge.server_rx.recv().await.unwrap();

        bridge.send_clear().unwrap();
        assert!(matches!(
            bridge.server_rx.recv().await.unwrap(),
            ServerMessage::Cleared
        ));
    }

    #[tokio::test]
    async fn test_failed_turn_reports_error_inline() {
        let mut bridge = start_session(DispatchMode::Stateless);
        let _history = bridge.server_rx.recv().await.unwrap();

        bridge.send_prompt("   ").unwrap();
        let ServerMessage::Error { message } = bridge.server_rx.recv().await.unwrap() else {
            panic!("expected an error");
        };
        assert!(message.contains("empty"));

        // The session keeps serving after a failed turn.
        bridge.send_prompt("still here").unwrap();
        assert!(matches!(
            bridge.server_rx.recv().await.unwrap(),
            ServerMessage::Turn { .. }
        ));
    }
}
