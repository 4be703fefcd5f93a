//! Command-line interface definition for ChatSync
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, conversation management,
//! and provider selection.

use crate::client::types::ExportFormat;
use clap::{Parser, Subcommand};

/// ChatSync - conversational AI client with backend state reconciliation
///
/// Chat with an AI backend while the client keeps its cached view of
/// conversations, messages, and provider settings consistent with the
/// server.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ChatSync
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing conversation by id
        #[arg(short = 'r', long)]
        resume: Option<u64>,

        /// Override the provider for this session (not persisted)
        #[arg(short, long)]
        provider: Option<String>,

        /// Override the model for this session (requires --provider)
        #[arg(short, long, requires = "provider")]
        model: Option<String>,
    },

    /// Manage conversations
    Conversations {
        /// Conversation management subcommand
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Manage AI providers
    Providers {
        /// Provider management subcommand
        #[command(subcommand)]
        command: ProviderCommand,
    },
}

/// Conversation management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConversationCommand {
    /// List conversations
    List,

    /// Show one conversation with its messages
    Show {
        /// Conversation id
        id: u64,

        /// Include the analytics report (message, word, reaction counts)
        #[arg(long)]
        stats: bool,
    },

    /// End a conversation and print its generated summary
    End {
        /// Conversation id
        id: u64,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: u64,
    },

    /// Search conversations (local filter plus semantic ranking)
    Search {
        /// Query text
        query: String,

        /// Skip the semantic stage and filter locally only
        #[arg(long)]
        local_only: bool,
    },

    /// Export a conversation to a document file
    Export {
        /// Conversation id
        id: u64,

        /// Document format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,

        /// Output path (defaults to conversation-<id>.<ext>)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Create a time-limited share link for a conversation
    Share {
        /// Conversation id
        id: u64,

        /// Days until the link expires
        #[arg(long, default_value_t = 7)]
        expiry_days: u32,
    },

    /// View a conversation shared by someone else
    Shared {
        /// Share token (or full share URL)
        token: String,
    },
}

/// Provider management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProviderCommand {
    /// List configured providers and the active selection
    List,

    /// Persist a provider override
    Select {
        /// Provider id (as listed by `providers list`)
        provider: String,

        /// Model to request from that provider
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Remove the persisted override, returning to backend preference
    Clear,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
