//! Interactive chat session handler
//!
//! Runs a readline-based loop over a [`ChatSession`]: regular input is
//! sent as a message, slash commands manage the conversation, the search
//! pipeline, and provider selection. When a send lands in an ended
//! conversation the loop offers the fork-and-resend recovery action
//! instead of dropping the input.

use crate::client::types::{Message, Sender};
use crate::config::Config;
use crate::error::Result;
use crate::provider::OverrideStore;
use crate::session::{ChatSession, SessionSend};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Start an interactive chat session
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `resume` - Optional conversation id to resume
/// * `provider` - Optional session-only provider override
/// * `model` - Optional model for the override
pub async fn run_chat(
    config: Config,
    resume: Option<u64>,
    provider: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let store = OverrideStore::new()?;
    let mut session = ChatSession::new(backend, &config, store);

    match session.refresh_providers().await {
        Ok(Some(selection)) => {
            println!(
                "{}",
                format!("Provider: {}", selection.provider_id).cyan()
            );
        }
        Ok(None) => {
            println!(
                "{}",
                "No AI provider is configured; sending is disabled until one is.".yellow()
            );
        }
        Err(e) => {
            tracing::warn!("Could not fetch provider configuration: {}", e);
            println!(
                "{}",
                "Could not reach the backend for provider configuration.".yellow()
            );
        }
    }

    if let Some(provider_id) = provider {
        session.select_provider(&provider_id, model)?;
        println!(
            "{}",
            format!("Using provider override: {}", provider_id).cyan()
        );
    }

    session.refresh_conversations().await.ok();

    if let Some(id) = resume {
        let conversation = session.open(id).await?;
        println!(
            "{}",
            format!(
                "Resumed \"{}\" ({}, {} messages)",
                conversation.title,
                conversation.status.as_str(),
                session.messages().len()
            )
            .cyan()
        );
        for message in session.messages() {
            print_message(&message);
        }
        if session.state() == crate::lifecycle::LifecycleState::Ended {
            println!(
                "{}",
                "This conversation has ended; a new message will offer to fork it.".yellow()
            );
        }
    }

    print_welcome();

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                if let Some(command) = trimmed.strip_prefix('/') {
                    if !handle_slash_command(&mut session, &mut rl, command).await? {
                        break;
                    }
                    continue;
                }

                dispatch_message(&mut session, &mut rl, trimmed).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Send one message, walking the recovery flow when the conversation ended
async fn dispatch_message(session: &mut ChatSession, rl: &mut DefaultEditor, text: &str) {
    match session.send(text).await {
        Ok(SessionSend::Delivered(outcome)) => {
            if outcome.created_conversation.is_some() {
                println!(
                    "{}",
                    format!("Started conversation {}", outcome.conversation_id).cyan()
                );
            }
            print_message(&outcome.ai_message);
        }
        Ok(SessionSend::HeldForRecovery) => {
            offer_fork(session, rl).await;
        }
        Err(failure) => {
            eprintln!("{}", format!("Error: {}", failure).red());
            println!(
                "{}",
                format!("Your message was not sent: {:?}", failure.text).yellow()
            );
        }
    }
}

/// Offer to replay held text into a new conversation
async fn offer_fork(session: &mut ChatSession, rl: &mut DefaultEditor) {
    let held = match session.held_text() {
        Some(text) => text.to_string(),
        None => return,
    };

    println!(
        "{}",
        "This conversation has ended and cannot accept new messages.".yellow()
    );
    println!("Held message: {:?}", held);

    let answer = rl.readline("Start a new conversation with this message? [y/N] ");
    let accepted = matches!(answer.as_deref().map(str::trim), Ok("y") | Ok("Y"));
    if !accepted {
        println!(
            "{}",
            "Message kept; send again or /new to start fresh.".cyan()
        );
        return;
    }

    match session.fork_and_resend().await {
        Ok(Some(outcome)) => {
            println!(
                "{}",
                format!("Continued in conversation {}", outcome.conversation_id).green()
            );
            print_message(&outcome.ai_message);
        }
        Ok(None) => {}
        Err(failure) => {
            eprintln!("{}", format!("Error: {}", failure).red());
            println!(
                "{}",
                "The message is still held; try again with /fork.".yellow()
            );
        }
    }
}

/// Handle a slash command; returns false when the loop should exit
async fn handle_slash_command(
    session: &mut ChatSession,
    rl: &mut DefaultEditor,
    command: &str,
) -> Result<bool> {
    let mut parts = command.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match name {
        "new" => {
            let title = if arg.is_empty() { None } else { Some(arg) };
            let id = session.new_conversation(title).await?;
            println!("{}", format!("Started conversation {}", id).green());
        }
        "open" => match arg.parse::<u64>() {
            Ok(id) => {
                let conversation = session.open(id).await?;
                println!(
                    "{}",
                    format!("Opened \"{}\" ({})", conversation.title, conversation.status.as_str())
                        .cyan()
                );
                for message in session.messages() {
                    print_message(&message);
                }
            }
            Err(_) => println!("Usage: /open <conversation-id>"),
        },
        "end" => match session.end().await {
            Ok(response) => {
                println!("{}", "Conversation ended.".green());
                println!("Summary: {}", response.summary);
            }
            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
        },
        "fork" => offer_fork(session, rl).await,
        "search" => {
            if arg.is_empty() {
                println!("Usage: /search <query>");
            } else {
                run_search(session, arg).await;
            }
        }
        "provider" => {
            if arg.is_empty() {
                match session.provider() {
                    Some(selection) => println!("Provider: {}", selection.provider_id),
                    None => println!("No provider resolved."),
                }
                for info in session.providers() {
                    println!("  {} ({})", info.id, info.name);
                }
            } else {
                match session.select_provider(arg, None) {
                    Ok(()) => println!("{}", format!("Provider set to {}", arg).green()),
                    Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                }
            }
        }
        "bookmark" => match arg.parse::<u64>() {
            Ok(message_id) => match session.toggle_bookmark(message_id).await {
                Ok(true) => println!("{}", "Bookmarked.".green()),
                Ok(false) => println!("{}", "Bookmark removed.".green()),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            },
            Err(_) => println!("Usage: /bookmark <message-id>"),
        },
        "react" => {
            let mut args = arg.splitn(2, ' ');
            match (args.next().and_then(|s| s.parse::<u64>().ok()), args.next()) {
                (Some(message_id), Some(reaction)) if !reaction.trim().is_empty() => {
                    match session.add_reaction(message_id, reaction.trim()).await {
                        Ok(()) => println!("{}", "Reaction added.".green()),
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    }
                }
                _ => println!("Usage: /react <message-id> <emoji>"),
            }
        }
        "list" => {
            session.refresh_conversations().await?;
            for conversation in session.conversations() {
                println!(
                    "  [{}] {} ({}, {} messages)",
                    conversation.id,
                    conversation.title,
                    conversation.status.as_str(),
                    conversation.message_count
                );
            }
        }
        "help" => print_help(),
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command: /{} (try /help)", other),
    }
    Ok(true)
}

/// Run one search round trip and print the merged results
async fn run_search(session: &mut ChatSession, query: &str) {
    session.refresh_conversations().await.ok();

    let mut rx = session.search_results();
    session.search(query);

    // Local results land synchronously; wait out the debounce window for
    // the semantic stage before printing the final snapshot.
    let results = match tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.query == query && snapshot.stage != crate::search::SearchStage::Pending {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return session.current_search();
            }
        }
    })
    .await
    {
        Ok(results) => results,
        Err(_) => session.current_search(),
    };

    if results.is_degraded() {
        println!(
            "{}",
            "Semantic search unavailable; showing local matches only.".yellow()
        );
    }
    if results.conversations.is_empty() {
        println!("No matches.");
    }
    for conversation in &results.conversations {
        println!(
            "  [{}] {} ({})",
            conversation.id,
            conversation.title,
            conversation.status.as_str()
        );
    }
    session.clear_search();
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::User => println!("{} {}", "you:".bold(), message.content),
        Sender::Ai => println!("{} {}\n", "ai: ".green().bold(), message.content),
    }
}

fn print_welcome() {
    println!("\nChatSync interactive session");
    println!("Type a message to send it, '/help' for commands, '/quit' to exit\n");
}

fn print_help() {
    println!("Commands:");
    println!("  /new [title]     start a new conversation");
    println!("  /open <id>       open an existing conversation");
    println!("  /list            list conversations");
    println!("  /end             end the current conversation");
    println!("  /fork            replay a held message into a new conversation");
    println!("  /search <query>  search conversations");
    println!("  /provider [id]   show or set the AI provider");
    println!("  /bookmark <id>   toggle a bookmark on a message");
    println!("  /react <id> <e>  add an emoji reaction to a message");
    println!("  /quit            exit");
}
