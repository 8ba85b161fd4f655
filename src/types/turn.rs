//! Caller-visible turn types.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::history::HistoryEntry;

/// Callback receiving caller-visible text fragments while a turn streams.
///
/// Directive syntax never reaches it, and it never sees errors.
pub type ChunkCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-call options for `execute` / `continue_turn`.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Streaming callback for this turn.
    pub on_chunk: Option<ChunkCallback>,
    /// Model override. Only honored by the call that opens the session.
    pub model: Option<String>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_callback(mut self, callback: ChunkCallback) -> Self {
        self.on_chunk = Some(callback);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("on_chunk", &self.on_chunk.as_ref().map(|_| ".."))
            .field("model", &self.model)
            .finish()
    }
}

/// Resolution status of a turn. Failed turns surface as `Err` instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum TurnStatus {
    Success,
}

/// Result of one caller-visible turn, however many action round-trips it took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub status: TurnStatus,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_payload: Option<serde_json::Value>,
    pub need_more_input: bool,
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
    pub finished_at: DateTime<Utc>,
}
