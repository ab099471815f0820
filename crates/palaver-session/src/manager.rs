//! Session registry for multi-connection frontends.

use std::collections::HashMap;
use std::sync::Arc;

use palaver_core::{Attachment, ChatModel, Message};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::dispatcher::{DispatchError, DispatchMode, Dispatcher};

/// Session identifier.
pub type SessionId = Uuid;

/// Session manager error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Registry mapping live connections to their dispatchers.
///
/// Every session gets its own mutex, so each one handles a single
/// interaction at a time while a slow remote call in one session never
/// stalls another.
pub struct SessionManager<M: ChatModel> {
    model: Arc<M>,
    mode: DispatchMode,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Dispatcher<M>>>>>,
}

impl<M: ChatModel> SessionManager<M> {
    /// Create a manager that dispatches to the given model.
    #[must_use]
    pub fn new(model: M, mode: DispatchMode) -> Self {
        Self {
            model: Arc::new(model),
            mode,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty session and return its id.
    pub async fn open(&self) -> SessionId {
        let id = Uuid::new_v4();
        let dispatcher = Dispatcher::new(Arc::clone(&self.model), self.mode);
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(dispatcher)));
        tracing::debug!(session = %id, "session opened");
        id
    }

    /// Destroy a session and everything it holds.
    pub async fn close(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            tracing::debug!(session = %id, "session closed");
        }
    }

    async fn session(&self, id: SessionId) -> Result<Arc<Mutex<Dispatcher<M>>>, ManagerError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ManagerError::NotFound(id))
    }

    /// Dispatch one prompt on the given session.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session, otherwise whatever the
    /// dispatcher reports; the failed turn leaves the session unchanged.
    pub async fn dispatch(
        &self,
        id: SessionId,
        prompt: &str,
        attachment: Option<Attachment>,
    ) -> Result<String, ManagerError> {
        let session = self.session(id).await?;
        let mut dispatcher = session.lock().await;
        let reply = dispatcher.send(prompt, attachment).await.inspect_err(|e| {
            tracing::warn!(session = %id, error = %e, "turn failed; history unchanged");
        })?;
        Ok(reply)
    }

    /// Clear a session's history (and model chat, where one exists).
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn clear(&self, id: SessionId) -> Result<(), ManagerError> {
        let session = self.session(id).await?;
        session.lock().await.clear();
        Ok(())
    }

    /// Cloned snapshot of a session's history, for rendering.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn snapshot(&self, id: SessionId) -> Result<Vec<Message>, ManagerError> {
        let session = self.session(id).await?;
        let dispatcher = session.lock().await;
        Ok(dispatcher.snapshot().to_vec())
    }
}
