//! Handlers for the `chat` and `list` commands.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::RunnerConfig;
use crate::error::SkillError;
use crate::runner::SkillRunner;
use crate::skills::{list_skills, load_skill};
use crate::types::{ChunkCallback, ExecuteOptions};

use super::{ChatArgs, ListArgs};

const EXIT_COMMANDS: [&str; 4] = ["quit", "exit", "q", "bye"];

pub fn handle_list(args: &ListArgs) -> Result<(), SkillError> {
    let skills = list_skills(&args.skills_dir);
    if skills.is_empty() {
        println!("No skills found in {}", args.skills_dir.display());
    }
    for name in skills {
        println!("{name}");
    }
    Ok(())
}

pub async fn handle_chat(args: ChatArgs) -> Result<(), SkillError> {
    let mut config = RunnerConfig::load()?;
    if let Some(t) = args.temperature {
        config.session.temperature = Some(t);
    }
    if let Some(max) = args.max_tokens {
        config.session.max_tokens = Some(max);
    }
    let skill = load_skill(&args.skills_dir, &args.skill)?;
    let mut runner = SkillRunner::from_config(skill.clone(), &config)?;

    if let Some(prompt) = args.prompt {
        let result = runner.execute(prompt, streaming_options(args.model)).await;
        println!(); // newline after streaming
        runner.end().await;
        return result.map(|_| ());
    }

    println!(
        "Chatting with '{}'. Commands: quit, history, clear.",
        skill.name
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut started = false;

    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let command = input.to_lowercase();
        if EXIT_COMMANDS.contains(&command.as_str()) {
            break;
        }
        match command.as_str() {
            "history" => {
                for entry in runner.history() {
                    println!("[{}] {}", entry.role, entry.content);
                }
                continue;
            }
            "clear" => {
                runner.end().await;
                runner = SkillRunner::from_config(skill.clone(), &config)?;
                started = false;
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        let result = if started {
            runner.continue_turn(input, streaming_options(None)).await
        } else {
            started = true;
            runner
                .execute(input, streaming_options(args.model.clone()))
                .await
        };
        println!();

        match result {
            Ok(turn) if turn.need_more_input => eprintln!("(more information needed)"),
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {e}");
                if runner.state().is_terminal() {
                    break;
                }
            }
        }
    }

    runner.end().await;
    Ok(())
}

/// Options that stream visible reply text straight to stdout.
fn streaming_options(model: Option<String>) -> ExecuteOptions {
    let on_chunk: ChunkCallback = Arc::new(|text: &str| {
        print!("{text}");
        let _ = std::io::stdout().flush();
    });
    let options = ExecuteOptions::new().with_chunk_callback(on_chunk);
    match model {
        Some(model) => options.with_model(model),
        None => options,
    }
}
