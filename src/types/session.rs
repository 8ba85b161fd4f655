//! Messages sent into, and events read out of, a model session.

use serde::{Deserialize, Serialize};

/// A user-role message pushed into the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMessage {
    pub session_id: String,
    pub content: String,
}

/// One event read from the session stream, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Bookkeeping from the service (init, keepalive). Ignored by the driver.
    System { subtype: String },
    /// Incremental assistant text.
    TextDelta { text: String },
    /// The complete assistant message for the current model turn.
    AssistantMessage { text: String },
    /// The model finished its turn.
    TurnComplete,
    /// Transport-level failure. Terminal for the session.
    Error { message: String },
}

impl SessionEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn assistant_message(text: impl Into<String>) -> Self {
        Self::AssistantMessage { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
