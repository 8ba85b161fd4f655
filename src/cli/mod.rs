//! CLI entry point for skill-runner.

pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Skill runner CLI
#[derive(Parser, Debug)]
#[command(name = "skill-runner", version, about = "Chat with a script-backed skill")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a conversation with a skill
    Chat(ChatArgs),
    /// List available skills
    List(ListArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Skill name (directory under the skills root)
    pub skill: String,

    /// Skills root directory
    #[arg(short = 'd', long, default_value = "skills")]
    pub skills_dir: PathBuf,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Send one prompt, print the reply, and exit
    #[arg(short, long)]
    pub prompt: Option<String>,
}

/// Arguments for the `list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Skills root directory
    #[arg(short = 'd', long, default_value = "skills")]
    pub skills_dir: PathBuf,
}
