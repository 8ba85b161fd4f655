//! Fixed framing wrapped around every caller input.
//!
//! The model sees the full skill text on every turn, followed by the
//! directive instructions and the caller's input.

use crate::directive::{EXECUTE_CLOSE, EXECUTE_OPEN, USER_INPUT_FIELD};
use crate::skills::SkillReference;

/// Render the skill framing: skill text plus how to request an action.
pub fn system_framing(skill: &SkillReference) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("# Skill Information".into());
    parts.push(String::new());
    let metadata = &skill.metadata;
    if let Some(title) = &metadata.title {
        parts.push(format!("Title: {title}"));
    }
    if let Some(description) = &metadata.description {
        parts.push(format!("Description: {description}"));
    }
    if let Some(usage) = &metadata.usage {
        parts.push(format!("Usage: {usage}"));
    }
    if !metadata.is_empty() {
        parts.push(String::new());
    }
    parts.push(skill.instructions.clone());
    parts.push(String::new());

    if let Some(readme) = &skill.readme {
        parts.push("# Additional Information".into());
        parts.push(String::new());
        parts.push(readme.clone());
        parts.push(String::new());
    }

    parts.push("# How to Use".into());
    parts.push(String::new());
    parts.push(
        "**Important**: The reference data above has been fully provided to you, do not attempt to read files."
            .into(),
    );
    parts.push(String::new());
    parts.push(
        "When you receive user input, if you need to execute a script to complete the task, include the following marker in your response:"
            .into(),
    );
    parts.push(String::new());
    parts.push("```".into());
    parts.push(EXECUTE_OPEN.into());
    parts.push(format!("{USER_INPUT_FIELD} <user's original input>"));
    parts.push(EXECUTE_CLOSE.into());
    parts.push("```".into());
    parts.push(String::new());
    parts.push(
        "After the script executes, you will receive the result, then reply to the user based on the result."
            .into(),
    );
    parts.push(String::new());

    parts.join("\n")
}

/// Wrap one caller input with the skill framing.
pub fn wrap_user_input(skill: &SkillReference, input: &str) -> String {
    format!("{}\n\n---\n\nUser Input: {input}", system_framing(skill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillMetadata;

    fn skill() -> SkillReference {
        SkillReference::new("lister", "/skills/lister", "# Lister\nLists things.")
    }

    #[test]
    fn framing_embeds_skill_text_and_directive_syntax() {
        let framing = system_framing(&skill());
        assert!(framing.starts_with("# Skill Information\n\n# Lister\nLists things."));
        assert!(framing.contains("[EXECUTE_SCRIPT]\nuser_input: <user's original input>\n[/EXECUTE_SCRIPT]"));
        assert!(!framing.contains("# Additional Information"));
    }

    #[test]
    fn readme_and_metadata_are_included_when_present() {
        let skill = skill().with_readme("Extra notes").with_metadata(SkillMetadata {
            title: Some("Lister".into()),
            description: None,
            usage: Some("ask for a list".into()),
        });
        let framing = system_framing(&skill);
        assert!(framing.contains("Title: Lister\nUsage: ask for a list\n"));
        assert!(framing.contains("# Additional Information\n\nExtra notes"));
    }

    #[test]
    fn user_input_follows_separator() {
        let wrapped = wrap_user_input(&skill(), "list skills");
        assert!(wrapped.ends_with("\n---\n\nUser Input: list skills"));
    }
}
