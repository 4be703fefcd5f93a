//! Conversation management command handlers

use crate::client::Backend;
use crate::config::Config;
use crate::error::Result;
use crate::search::local_filter;
use colored::Colorize;

/// List conversations
pub async fn list(config: Config) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let conversations = backend.list_conversations().await?;

    if conversations.is_empty() {
        println!("No conversations.");
        return Ok(());
    }
    for conversation in &conversations {
        println!(
            "[{}] {} ({}, {} messages)",
            conversation.id,
            conversation.title,
            conversation.status.as_str(),
            conversation.message_count
        );
    }
    Ok(())
}

/// Show one conversation with its messages
pub async fn show(config: Config, id: u64, stats: bool) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let conversation = backend.get_conversation(id).await?;

    println!(
        "{} ({})",
        conversation.title.bold(),
        conversation.status.as_str()
    );
    if let Some(summary) = &conversation.summary {
        println!("Summary: {}", summary);
    }
    if !conversation.topics.is_empty() {
        println!("Topics: {}", conversation.topics.join(", "));
    }
    println!();

    for message in conversation.messages.unwrap_or_default() {
        match message.sender {
            crate::client::types::Sender::User => {
                println!("{} {}", "you:".bold(), message.content)
            }
            crate::client::types::Sender::Ai => {
                println!("{} {}", "ai: ".green().bold(), message.content)
            }
        }
    }

    if stats {
        let report = backend.conversation_stats(id).await?;
        println!();
        println!("{}", "Statistics".bold());
        println!(
            "  Messages: {} ({} you, {} ai)",
            report.message_counts.total, report.message_counts.user, report.message_counts.ai
        );
        println!(
            "  Words: {} ({} you, {} ai)",
            report.word_counts.total, report.word_counts.user, report.word_counts.ai
        );
        if let Some(duration) = report.duration_seconds {
            println!("  Duration: {:.0}s", duration);
        }
        println!("  Bookmarked messages: {}", report.bookmarked_messages);
        if !report.reactions.is_empty() {
            let mut reactions: Vec<_> = report.reactions.iter().collect();
            reactions.sort_by(|a, b| a.0.cmp(b.0));
            let summary: Vec<String> = reactions
                .iter()
                .map(|(emoji, count)| format!("{} {}", emoji, count))
                .collect();
            println!("  Reactions: {}", summary.join(", "));
        }
    }
    Ok(())
}

/// Export a conversation to a document file
pub async fn export(
    config: Config,
    id: u64,
    format: crate::client::ExportFormat,
    output: Option<String>,
) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let document = backend.export_conversation(id, format).await?;

    let path = output.unwrap_or_else(|| format!("conversation-{}.{}", id, format.extension()));
    std::fs::write(&path, &document)?;
    println!(
        "{}",
        format!(
            "Exported conversation {} to {} ({} bytes)",
            id,
            path,
            document.len()
        )
        .green()
    );
    Ok(())
}

/// Create a share link for a conversation
pub async fn share(config: Config, id: u64, expiry_days: u32) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let link = backend.create_share_link(id, expiry_days).await?;

    println!("{}", format!("Share link for conversation {}:", id).green());
    println!("  Token:   {}", link.share_token);
    println!("  URL:     {}", link.share_url);
    println!("  Expires: {}", link.expires_at);
    Ok(())
}

/// View a conversation shared by someone else
pub async fn shared(config: Config, token: String) -> Result<()> {
    let backend = super::build_backend(&config)?;

    // Accept a pasted share URL as well as the bare token.
    let token = token
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(&token);
    let shared = backend.get_shared_conversation(token).await?;

    println!(
        "{} ({})",
        shared.conversation.title.bold(),
        shared.conversation.status.as_str()
    );
    if let Some(summary) = &shared.conversation.summary {
        println!("Summary: {}", summary);
    }
    println!();
    for message in &shared.messages {
        match message.sender {
            crate::client::types::Sender::User => {
                println!("{} {}", "you:".bold(), message.content)
            }
            crate::client::types::Sender::Ai => {
                println!("{} {}", "ai: ".green().bold(), message.content)
            }
        }
    }
    Ok(())
}

/// End a conversation and print its generated summary
pub async fn end(config: Config, id: u64) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let response = backend.end_conversation(id).await?;

    println!("{}", format!("Conversation {} ended.", id).green());
    println!("Summary: {}", response.summary);
    Ok(())
}

/// Delete a conversation
pub async fn delete(config: Config, id: u64) -> Result<()> {
    let backend = super::build_backend(&config)?;
    backend.delete_conversation(id).await?;
    println!("{}", format!("Conversation {} deleted.", id).green());
    Ok(())
}

/// Search conversations
///
/// Runs the backend semantic search and merges the local filter over the
/// full listing, matching the interactive pipeline. With `local_only` the
/// semantic stage is skipped entirely.
pub async fn search(config: Config, query: String, local_only: bool) -> Result<()> {
    let backend = super::build_backend(&config)?;

    let listing = backend.list_conversations().await?;
    let local = local_filter(&listing, &query);

    let merged = if local_only {
        local
    } else {
        match backend.search_conversations(&query, true).await {
            Ok(semantic) => crate::search::merge_results(semantic, local),
            Err(e) => {
                tracing::warn!("Semantic search failed: {}", e);
                println!(
                    "{}",
                    "Semantic search unavailable; showing local matches only.".yellow()
                );
                local
            }
        }
    };

    if merged.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for conversation in &merged {
        println!(
            "[{}] {} ({})",
            conversation.id,
            conversation.title,
            conversation.status.as_str()
        );
    }
    Ok(())
}
