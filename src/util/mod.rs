//! Utility modules: retry, timeout, reply text helpers.

pub mod retry;
pub mod text;
pub mod timeout;
