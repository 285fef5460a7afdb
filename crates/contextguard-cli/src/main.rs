use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use contextguard_application::{ChatUseCase, RevealFrame};
use contextguard_core::completion::CompletionEngine;
use contextguard_core::memory::{ContextSlotRepository, ContextVault, InMemorySlotRepository};
use contextguard_core::session::Sender;
use contextguard_infrastructure::JsonSlotRepository;
use contextguard_interaction::GeminiApiAgent;

/// ContextGuard - memory-powered conversational assistant.
#[derive(Parser)]
#[command(name = "contextguard", version, about)]
struct Cli {
    /// Keep memories in RAM only for this run (nothing is written to disk)
    #[arg(long)]
    ephemeral: bool,

    /// Override the completion model name
    #[arg(long)]
    model: Option<String>,
}

/// One REPL turn: either a fresh user message or a regeneration request.
enum Turn {
    Message(String),
    Regenerate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let repo: Arc<dyn ContextSlotRepository> = if cli.ephemeral {
        Arc::new(InMemorySlotRepository::new())
    } else {
        Arc::new(JsonSlotRepository::default_location()?)
    };
    let vault = Arc::new(ContextVault::new(repo));

    let mut agent = GeminiApiAgent::try_from_env()
        .context("set GEMINI_API_KEY to talk to the completion engine")?;
    if let Some(model) = cli.model {
        agent = agent.with_model(model);
    }
    let engine: Arc<dyn CompletionEngine> = Arc::new(agent);

    let chat = ChatUseCase::new(engine, vault);
    let memory_count = chat.list_memories().await.len();

    println!("{}", "=== ContextGuard ===".bright_magenta().bold());
    println!(
        "{}",
        format!("{memory_count} memories loaded. Use \"save\" or \"remember\" to store information.")
            .bright_black()
    );
    println!(
        "{}",
        "Commands: /memories /delete <id> /clear /stop /regen /quit  (Ctrl-C stops a running answer)"
            .bright_black()
    );
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed {
                    "/quit" | "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    "/memories" => print_memories(&chat).await,
                    "/clear" => {
                        chat.clear_memories().await;
                        println!("{}", "All memories cleared".bright_blue());
                    }
                    "/stop" => {
                        if chat.can_stop().await {
                            chat.stop().await;
                        } else {
                            println!("{}", "Nothing to stop".bright_black());
                        }
                    }
                    "/regen" => {
                        if chat.can_regenerate().await {
                            run_turn(&chat, Turn::Regenerate).await?;
                        } else {
                            println!("{}", "Nothing to regenerate yet".bright_black());
                        }
                    }
                    _ if trimmed.starts_with("/delete") => {
                        match trimmed.strip_prefix("/delete").map(str::trim) {
                            Some(id) if !id.is_empty() => {
                                chat.delete_memory(id).await;
                                println!("{}", "Memory deleted".bright_blue());
                            }
                            _ => println!("{}", "Usage: /delete <id>".bright_black()),
                        }
                    }
                    _ if trimmed.starts_with('/') => {
                        println!("{}", "Unknown command".bright_black());
                    }
                    _ => {
                        println!("{}", format!("> {trimmed}").green());
                        run_turn(&chat, Turn::Message(trimmed.to_string())).await?;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}

/// Drives one generation turn: runs the pipeline in the background, streams
/// reveal frames to the terminal as they land, and maps Ctrl-C to a stop
/// request instead of killing the process.
async fn run_turn(chat: &ChatUseCase, turn: Turn) -> Result<()> {
    let before = chat.transcript().await.len();
    let mut rx = chat.subscribe_reveal();
    // Ignore whatever frame is left over from a previous turn.
    rx.borrow_and_update();

    let mut task = {
        let chat = chat.clone();
        tokio::spawn(async move {
            match turn {
                Turn::Message(text) => chat.handle_user_message(&text).await,
                Turn::Regenerate => chat.regenerate().await,
            }
        })
    };

    // (message id, characters already printed) of the live reveal.
    let mut printed: Option<(String, usize)> = None;

    loop {
        tokio::select! {
            res = &mut task => {
                res.context("generation task panicked")??;
                break;
            }
            changed = rx.changed() => {
                if changed.is_ok() {
                    let frame = rx.borrow_and_update().clone();
                    if let Some(frame) = frame {
                        print_frame_delta(&mut printed, &frame);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                chat.stop().await;
            }
        }
    }

    // The task may have finished between the last frame and the join; drain
    // the final frame so the tail of the answer is not lost.
    let frame = rx.borrow_and_update().clone();
    if let Some(frame) = frame {
        print_frame_delta(&mut printed, &frame);
    }
    if printed.is_some() {
        println!();
    }

    // Surface messages that never went through the reveal (confirmations,
    // notices, apologies, mid-stage cancellations).
    for message in chat.transcript().await.iter().skip(before) {
        if message.sender == Sender::User {
            continue;
        }
        let fully_printed = printed
            .as_ref()
            .map(|(id, count)| *id == message.id && *count == message.text.chars().count())
            .unwrap_or(false);
        if fully_printed {
            continue;
        }
        for line in message.text.lines() {
            println!("{}", line.bright_blue());
        }
    }

    Ok(())
}

/// Prints the new suffix of a reveal frame, tracking what is already on
/// screen so partial updates never reprint earlier characters.
fn print_frame_delta(printed: &mut Option<(String, usize)>, frame: &RevealFrame) {
    let chars: Vec<char> = frame.text.chars().collect();
    let already = match printed {
        Some((id, count)) if *id == frame.message_id => *count,
        _ => 0,
    };

    if chars.len() > already {
        let suffix: String = chars[already..].iter().collect();
        print!("{}", suffix.bright_blue());
        let _ = std::io::stdout().flush();
    }

    *printed = Some((frame.message_id.clone(), chars.len().max(already)));
}

async fn print_memories(chat: &ChatUseCase) {
    let memories = chat.list_memories().await;
    if memories.is_empty() {
        println!("{}", "No memories yet".bright_black());
        return;
    }

    for record in memories {
        println!("{}", format!("[{}] {}", record.id, record.name).bright_magenta());
        println!("  {}", record.content);
        println!(
            "  {}",
            record
                .updated_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black()
        );
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CONTEXTGUARD_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
