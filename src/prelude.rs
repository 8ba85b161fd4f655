//! Convenience re-exports for common use.

pub use crate::action::{ActionExecutor, ScriptExecutor};
pub use crate::config::{ConnectionDescriptor, RunnerConfig};
pub use crate::error::{Result, SkillError};
pub use crate::runner::{DriverState, SkillRunner};
pub use crate::session::{ModelSession, OpenAiConnector, SessionConnector};
pub use crate::skills::{load_skill, SkillReference};
pub use crate::types::{
    ActionOutcome, ActionStatus, ChunkCallback, ExecuteOptions, HistoryEntry, Role,
    SessionSettings, TurnResult, TurnStatus,
};
