//! Client side of the task API: HTTP client, persisted session, the cached
//! task list and the focus timer.

use thiserror::Error;

pub mod api;
pub mod focus;
pub mod normalize;
pub mod session;
pub mod store;

pub use api::{ApiClient, AuthApi, TaskApi, TaskForm, TaskUpdate};
pub use focus::{FocusError, FocusPhase, FocusSnapshot, FocusTimer};
pub use session::{FileStorage, MemoryStorage, Session, SessionManager, SessionStorage};
pub use store::{CompleteTask, TaskStats, TaskStore};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-success response; `message` is the server's message verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),
}
