//! ChatSync - conversational AI client CLI
//!
#![doc = "ChatSync - conversational AI client CLI"]
#![doc = "Main entry point for the ChatSync application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatsync::cli::{Cli, Commands, ConversationCommand, ProviderCommand};
use chatsync::commands;
use chatsync::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat {
            resume,
            provider,
            model,
        } => {
            tracing::info!("Starting interactive chat session");
            if let Some(id) = resume {
                tracing::debug!("Resuming conversation: {}", id);
            }
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }

            commands::chat::run_chat(config, resume, provider, model).await?;
            Ok(())
        }
        Commands::Conversations { command } => match command {
            ConversationCommand::List => {
                commands::conversations::list(config).await?;
                Ok(())
            }
            ConversationCommand::Show { id, stats } => {
                commands::conversations::show(config, id, stats).await?;
                Ok(())
            }
            ConversationCommand::End { id } => {
                commands::conversations::end(config, id).await?;
                Ok(())
            }
            ConversationCommand::Delete { id } => {
                commands::conversations::delete(config, id).await?;
                Ok(())
            }
            ConversationCommand::Search { query, local_only } => {
                commands::conversations::search(config, query, local_only).await?;
                Ok(())
            }
            ConversationCommand::Export { id, format, output } => {
                commands::conversations::export(config, id, format, output).await?;
                Ok(())
            }
            ConversationCommand::Share { id, expiry_days } => {
                commands::conversations::share(config, id, expiry_days).await?;
                Ok(())
            }
            ConversationCommand::Shared { token } => {
                commands::conversations::shared(config, token).await?;
                Ok(())
            }
        },
        Commands::Providers { command } => match command {
            ProviderCommand::List => {
                commands::providers::list(config).await?;
                Ok(())
            }
            ProviderCommand::Select { provider, model } => {
                commands::providers::select(config, provider, model).await?;
                Ok(())
            }
            ProviderCommand::Clear => {
                commands::providers::clear()?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` raises the default
/// level to debug.
fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Default log filter when the environment does not provide one
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "chatsync=debug"
    } else {
        "chatsync=info"
    }
}
