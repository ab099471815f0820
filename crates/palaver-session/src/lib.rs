//! Session orchestration for conversational chat.
//!
//! Provides:
//! - `Dispatcher` - One user session: transcript plus optional model chat
//! - `SessionManager` - Registry of dispatchers for multi-connection frontends

pub mod dispatcher;
pub mod manager;

pub use dispatcher::{DispatchError, DispatchMode, Dispatcher};
pub use manager::{ManagerError, SessionId, SessionManager};
