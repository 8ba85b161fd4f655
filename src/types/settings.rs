//! Model session settings.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Settings applied to every request the session sends.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionSettings {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub user: Option<String>,
}
