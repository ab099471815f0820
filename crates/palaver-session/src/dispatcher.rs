//! Prompt dispatch for a single user session.

use std::sync::Arc;

use palaver_core::{Attachment, ChatModel, ContentPart, Message, ModelChat, ModelError, Transcript};
use uuid::Uuid;

/// Dispatch error. Every variant is recoverable: the caller reports it
/// inline and keeps serving; the failed turn leaves no trace in history.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("attachments are not supported in chat mode")]
    AttachmentUnsupported,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// How prompts reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Stateful: a lazily created model chat carries context across turns.
    Chat,
    /// Stateless: every turn is a standalone multimodal request.
    Stateless,
}

/// One user session: the transcript plus, in chat mode, the live model chat.
///
/// The two are reset together and only together — a cleared history with
/// surviving model context (or the reverse) would let the visible
/// conversation and the model's view of it diverge.
pub struct Dispatcher<M: ChatModel> {
    model: Arc<M>,
    mode: DispatchMode,
    transcript: Transcript,
    chat: Option<Box<dyn ModelChat>>,
}

impl<M: ChatModel> Dispatcher<M> {
    /// Create a dispatcher with an empty transcript.
    #[must_use]
    pub fn new(model: Arc<M>, mode: DispatchMode) -> Self {
        Self {
            model,
            mode,
            transcript: Transcript::new(),
            chat: None,
        }
    }

    /// Send one prompt to the model and record the completed turn.
    ///
    /// On success the user message and the assistant reply are appended to
    /// the transcript, in that order, and the reply text is returned.
    ///
    /// # Errors
    /// Fails on an empty prompt, on an attachment in chat mode, or on any
    /// model error. A failed send appends nothing.
    pub async fn send(
        &mut self,
        prompt: &str,
        attachment: Option<Attachment>,
    ) -> Result<String, DispatchError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DispatchError::EmptyPrompt);
        }

        let reply = match self.mode {
            DispatchMode::Chat => {
                if attachment.is_some() {
                    return Err(DispatchError::AttachmentUnsupported);
                }
                let mut chat = match self.chat.take() {
                    Some(chat) => chat,
                    None => self.model.start_chat().await?,
                };
                let result = chat.send(prompt).await;
                // The handle survives a failed send; its context rolled back.
                self.chat = Some(chat);
                result?
            }
            DispatchMode::Stateless => {
                let mut parts = vec![ContentPart::text(prompt)];
                if let Some(attachment) = attachment {
                    parts.push(attachment.into_part());
                }
                self.model.generate(&parts).await?
            }
        };

        self.transcript.append(Message::user(prompt));
        self.transcript.append(Message::assistant(reply.clone()));
        tracing::debug!(turns = self.transcript.len() / 2, "turn completed");

        Ok(reply)
    }

    /// Clear the history and drop the model chat in one operation.
    ///
    /// The next send in chat mode lazily opens a fresh chat.
    pub fn clear(&mut self) {
        if let Some(chat) = self.chat.take() {
            tracing::debug!(chat = %chat.id(), "dropping model chat with cleared history");
        }
        self.transcript.clear();
    }

    /// Read-only view of the conversation history.
    #[must_use]
    pub fn snapshot(&self) -> &[Message] {
        self.transcript.snapshot()
    }

    /// Identity of the live model chat, if one exists.
    #[must_use]
    pub fn chat_id(&self) -> Option<Uuid> {
        self.chat.as_ref().map(|chat| chat.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use palaver_core::Role;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted replies plus a record of everything sent to the model.
    #[derive(Default)]
    struct Script {
        replies: Mutex<VecDeque<Result<String, ()>>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<Vec<ContentPart>>>,
    }

    impl Script {
        fn next_reply(&self, parts: Vec<ContentPart>) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(parts);
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(())) => Err(ModelError::Api {
                    status: 500,
                    message: "scripted failure".to_string(),
                }),
                None => panic!("script exhausted"),
            }
        }
    }

    struct StubModel {
        script: Arc<Script>,
    }

    impl StubModel {
        fn new(replies: &[Result<&str, ()>]) -> (Arc<Self>, Arc<Script>) {
            let script = Arc::new(Script {
                replies: Mutex::new(
                    replies
                        .iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                ..Script::default()
            });
            let model = Arc::new(Self {
                script: Arc::clone(&script),
            });
            (model, script)
        }
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError> {
            self.script.next_reply(parts.to_vec())
        }

        async fn start_chat(&self) -> Result<Box<dyn ModelChat>, ModelError> {
            Ok(Box::new(StubChat {
                id: Uuid::new_v4(),
                script: Arc::clone(&self.script),
            }))
        }
    }

    struct StubChat {
        id: Uuid,
        script: Arc<Script>,
    }

    #[async_trait]
    impl ModelChat for StubChat {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn send(&mut self, text: &str) -> Result<String, ModelError> {
            self.script.next_reply(vec![ContentPart::text(text)])
        }
    }

    #[tokio::test]
    async fn test_single_turn_snapshot_is_exact() {
        let (model, _) = StubModel::new(&[Ok("Hi there")]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Stateless);

        let reply = dispatcher.send("Hello", None).await.unwrap();
        assert_eq!(reply, "Hi there");
        assert_eq!(
            dispatcher.snapshot(),
            [Message::user("Hello"), Message::assistant("Hi there")]
        );
    }

    #[tokio::test]
    async fn test_successful_sends_alternate_roles() {
        let (model, _) = StubModel::new(&[Ok("one"), Ok("two"), Ok("three")]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Chat);

        for prompt in ["a", "b", "c"] {
            dispatcher.send(prompt, None).await.unwrap();
        }

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.len(), 6);
        for (i, message) in snapshot.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
    }

    #[tokio::test]
    async fn test_failed_send_appends_nothing() {
        let (model, _) = StubModel::new(&[Ok("fine"), Err(())]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Stateless);

        dispatcher.send("first", None).await.unwrap();
        let before = dispatcher.snapshot().to_vec();

        let err = dispatcher.send("second", None).await.unwrap_err();
        assert!(matches!(err, DispatchError::Model(_)));
        assert_eq!(before, dispatcher.snapshot());
    }

    #[tokio::test]
    async fn test_new_dispatcher_makes_no_model_calls() {
        let (model, script) = StubModel::new(&[]);
        let dispatcher = Dispatcher::new(model, DispatchMode::Chat);

        assert!(dispatcher.snapshot().is_empty());
        assert_eq!(script.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_before_any_call() {
        let (model, script) = StubModel::new(&[]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Stateless);

        for prompt in ["", "   ", "\n\t"] {
            let err = dispatcher.send(prompt, None).await.unwrap_err();
            assert!(matches!(err, DispatchError::EmptyPrompt));
        }
        assert_eq!(script.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chat_mode_rejects_attachments() {
        let (model, script) = StubModel::new(&[]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Chat);

        let attachment = Attachment::new("image/png", vec![1, 2, 3]).unwrap();
        let err = dispatcher.send("look", Some(attachment)).await.unwrap_err();

        assert!(matches!(err, DispatchError::AttachmentUnsupported));
        assert_eq!(script.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_stateless_attachment_is_sent_exactly_once() {
        let (model, script) = StubModel::new(&[Ok("a cat")]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Stateless);

        let attachment = Attachment::new("image/jpeg", vec![0xff, 0xd8]).unwrap();
        dispatcher.send("what is this?", Some(attachment)).await.unwrap();

        let requests = script.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let images = requests[0]
            .iter()
            .filter(|part| matches!(part, ContentPart::InlineImage { .. }))
            .count();
        assert_eq!(images, 1);
    }

    #[tokio::test]
    async fn test_chat_survives_until_clear_then_recreates_fresh() {
        let (model, _) = StubModel::new(&[Ok("one"), Ok("two"), Ok("three")]);
        let mut dispatcher = Dispatcher::new(model, DispatchMode::Chat);

        assert_eq!(dispatcher.chat_id(), None);

        dispatcher.send("a", None).await.unwrap();
        let first = dispatcher.chat_id().unwrap();

        dispatcher.send("b", None).await.unwrap();
        assert_eq!(dispatcher.chat_id(), Some(first));

        dispatcher.clear();
        assert!(dispatcher.snapshot().is_empty());
        assert_eq!(dispatcher.chat_id(), None);

        dispatcher.send("c", None).await.unwrap();
        let second = dispatcher.chat_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(dispatcher.snapshot().len(), 2);
    }
}
