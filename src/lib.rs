//! skill-runner: conversation orchestration for script-backed skills.
//!
//! A [`SkillRunner`](runner::SkillRunner) drives one long-lived model session
//! on behalf of a skill. The model can ask for the skill's script to run by
//! emitting an `[EXECUTE_SCRIPT]` directive; the runner hides the directive
//! from the caller, runs the script, feeds the result back, and only resolves
//! the caller's turn once the model gives a final reply.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use skill_runner::prelude::*;
//!
//! # async fn example() -> skill_runner::error::Result<()> {
//! let config = RunnerConfig::load()?;
//! let skill = load_skill(Path::new("skills"), "weather")?;
//! let runner = SkillRunner::from_config(skill, &config)?;
//! let turn = runner.execute("forecast for Oslo", ExecuteOptions::new()).await?;
//! println!("{}", turn.content);
//! runner.end().await;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod directive;
pub mod error;
pub mod prelude;
pub mod prompt;
pub mod runner;
pub mod session;
pub mod skills;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
