//! The long-lived model session and how to open one.

pub mod http;
pub mod openai;

pub use openai::{OpenAiConnector, OpenAiSession};

use async_trait::async_trait;

use crate::error::SkillError;
use crate::types::{SessionEvent, SessionMessage};

/// A single live, bidirectional conversation with the model service.
///
/// Messages go in with [`send`](Self::send); the reply comes back as an
/// ordered event stream ending in [`SessionEvent::TurnComplete`]. Closing is
/// terminal.
#[async_trait]
pub trait ModelSession: Send {
    /// Push one user message into the session.
    async fn send(&mut self, message: SessionMessage) -> Result<(), SkillError>;

    /// Next event, or `None` once the session has nothing more to say.
    async fn next_event(&mut self) -> Option<Result<SessionEvent, SkillError>>;

    async fn close(&mut self) -> Result<(), SkillError>;
}

/// Parameters for opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub session_id: String,
    /// Overrides the connector's default model.
    pub model: Option<String>,
}

/// Opens sessions. The runner connects lazily on its first turn.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn ModelSession>, SkillError>;
}
