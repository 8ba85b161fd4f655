//! The script directive protocol embedded in model output.
//!
//! The model asks for an action by emitting
//!
//! ```text
//! [EXECUTE_SCRIPT]
//! user_input: <free text>
//! [/EXECUTE_SCRIPT]
//! ```
//!
//! and receives the outcome back as a `[SCRIPT_RESULT]` block. Both formats
//! are fixed: the system framing in [`crate::prompt`] teaches the model to
//! emit exactly this syntax.

mod filter;

pub use filter::ChunkFilter;

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ActionOutcome;

/// Opening marker of a directive block.
pub const EXECUTE_OPEN: &str = "[EXECUTE_SCRIPT]";
/// Closing marker of a directive block.
pub const EXECUTE_CLOSE: &str = "[/EXECUTE_SCRIPT]";
/// Label of the free-text field inside a directive block.
pub const USER_INPUT_FIELD: &str = "user_input:";
/// Opening marker of the result block fed back into the session.
pub const RESULT_OPEN: &str = "[SCRIPT_RESULT]";
/// Closing marker of the result block fed back into the session.
pub const RESULT_CLOSE: &str = "[/SCRIPT_RESULT]";

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[EXECUTE_SCRIPT\]\s*user_input:\s*(.+?)\s*\[/EXECUTE_SCRIPT\]")
        .expect("directive regex must compile")
});

/// Extract the payload of the first well-formed directive block.
///
/// Runs over the whole accumulated text of a streamed turn. Unterminated
/// blocks, blocks without the `user_input:` field, and blocks with an empty
/// payload yield `None`.
pub fn detect(accumulated: &str) -> Option<String> {
    DIRECTIVE_RE
        .captures(accumulated)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|payload| !payload.is_empty())
}

/// Number of well-formed directive blocks in `text`.
pub fn count(text: &str) -> usize {
    DIRECTIVE_RE.find_iter(text).count()
}

/// Whether the opening marker appears anywhere in `text`.
pub fn contains_marker(text: &str) -> bool {
    text.contains(EXECUTE_OPEN)
}

/// Render an action outcome as the follow-up message sent back to the model.
pub fn format_result(outcome: &ActionOutcome) -> String {
    let mut parts: Vec<&str> = vec![RESULT_OPEN, ""];

    if outcome.is_success() {
        parts.extend([
            "Script executed successfully, results are as follows:",
            "",
            "```json",
            outcome.raw_output.trim_end(),
            "```",
            "",
            "Please reply to the user based on the above results. If the results contain multiple options, clearly list them and ask the user to choose.",
        ]);
    } else {
        parts.extend([
            "Script execution failed:",
            outcome.error_message.as_deref().unwrap_or("Unknown error"),
            "",
            "Please answer the user directly based on the reference data.",
        ]);
    }

    parts.push(RESULT_CLOSE);
    parts.join("\n")
}
