use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where the session driver is in its lifecycle.
///
/// A caller turn moves `Idle -> Streaming`, then through `AwaitingAction`
/// and back to `Streaming` once per action round-trip, and ends in
/// `TurnComplete` before returning to `Idle`. `Failed` and `Closed` are
/// terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriverState {
    Idle,
    Streaming,
    AwaitingAction,
    TurnComplete,
    Failed,
    Closed,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}
