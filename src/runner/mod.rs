//! Turn orchestration: the input queue, the session driver task, and the
//! caller-facing [`SkillRunner`].

mod coordinator;
mod driver;
pub mod queue;
pub mod state;

pub use coordinator::{SessionIdGenerator, SkillRunner};
pub use queue::InputQueue;
pub use state::DriverState;
