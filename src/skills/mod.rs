//! Skill references: the raw instruction files a runner is built around.
//!
//! A skill is a directory under a skills root holding a required `SKILL.md`
//! and an optional `README.md`. Both are embedded verbatim into the session
//! framing; their markdown is not interpreted here.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::SkillError;

const SKILL_FILE_NAME: &str = "SKILL.md";
const README_FILE_NAME: &str = "README.md";

/// Optional descriptive fields a caller may attach to a skill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub usage: Option<String>,
}

impl SkillMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.usage.is_none()
    }
}

/// A loaded skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillReference {
    /// Directory name of the skill.
    pub name: String,
    /// Skill directory; actions run relative to it.
    pub dir: PathBuf,
    /// Raw `SKILL.md` body.
    pub instructions: String,
    /// Raw `README.md` body, when present.
    pub readme: Option<String>,
    pub metadata: SkillMetadata,
}

impl SkillReference {
    /// Build a reference from in-memory text (no filesystem access).
    pub fn new(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            instructions: instructions.into(),
            readme: None,
            metadata: SkillMetadata::default(),
        }
    }

    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    pub fn with_metadata(mut self, metadata: SkillMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Load `<skills_dir>/<name>`.
pub fn load_skill(skills_dir: &Path, name: &str) -> Result<SkillReference, SkillError> {
    if !is_plain_name(name) {
        return Err(SkillError::SkillNotFound(format!("invalid skill name: {name}")));
    }

    let dir = skills_dir.join(name);
    if !dir.is_dir() {
        return Err(SkillError::SkillNotFound(format!(
            "skill directory does not exist: {}",
            dir.display()
        )));
    }

    let skill_file = dir.join(SKILL_FILE_NAME);
    if !skill_file.is_file() {
        return Err(SkillError::SkillNotFound(format!(
            "skill is missing {SKILL_FILE_NAME}: {}",
            skill_file.display()
        )));
    }

    tracing::debug!(skill = name, dir = %dir.display(), "loading skill");

    let instructions = fs::read_to_string(&skill_file)?;
    let readme_file = dir.join(README_FILE_NAME);
    let readme = if readme_file.is_file() {
        Some(fs::read_to_string(&readme_file)?)
    } else {
        None
    };

    Ok(SkillReference {
        name: name.to_string(),
        dir,
        instructions,
        readme,
        metadata: SkillMetadata::default(),
    })
}

/// Names of all skill directories (those containing `SKILL.md`), sorted.
///
/// A missing or unreadable root yields an empty list.
pub fn list_skills(skills_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(skills_dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join(SKILL_FILE_NAME).is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

pub fn skill_exists(skills_dir: &Path, name: &str) -> bool {
    is_plain_name(name) && skills_dir.join(name).join(SKILL_FILE_NAME).is_file()
}

/// A single normal path component, so lookups cannot escape the root.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
