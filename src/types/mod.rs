//! Core types for skill-runner.

pub mod action;
pub mod history;
pub mod session;
pub mod settings;
pub mod turn;

pub use action::*;
pub use history::*;
pub use session::*;
pub use settings::*;
pub use turn::*;
