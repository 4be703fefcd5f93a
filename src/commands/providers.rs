//! Provider management command handlers

use crate::client::Backend;
use crate::config::Config;
use crate::error::Result;
use crate::provider::{resolve_provider, OverrideStore, ProviderSelection};
use colored::Colorize;

/// List configured providers and the resolved active selection
pub async fn list(config: Config) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let store = OverrideStore::new()?;

    let listing = backend.list_providers().await?;
    let saved = store.load();
    let current = if listing.current_provider.is_empty() {
        None
    } else {
        Some(listing.current_provider.as_str())
    };
    let resolved = resolve_provider(&listing.providers, saved.as_ref(), current);

    if listing.providers.is_empty() {
        println!(
            "{}",
            "No providers configured; sending is disabled.".yellow()
        );
        return Ok(());
    }

    for info in &listing.providers {
        let marker = match &resolved {
            Some(selection) if selection.provider_id == info.id => "*",
            _ => " ",
        };
        println!("{} {} ({})", marker, info.id, info.name);
    }

    match resolved {
        Some(selection) => {
            let source = if saved.is_some() {
                "saved override"
            } else if current == Some(selection.provider_id.as_str()) {
                "backend preference"
            } else {
                "first configured"
            };
            println!("\nActive: {} ({})", selection.provider_id.bold(), source);
            if let Some(model) = selection.model {
                println!("Model:  {}", model);
            }
        }
        None => println!("\nNo provider resolved."),
    }
    Ok(())
}

/// Persist a provider override
pub async fn select(config: Config, provider: String, model: Option<String>) -> Result<()> {
    let backend = super::build_backend(&config)?;
    let store = OverrideStore::new()?;

    // Validate against the configured set so a typo cannot wedge sending
    // behind a fall-through warning later.
    let listing = backend.list_providers().await?;
    if !listing.providers.iter().any(|p| p.id == provider) {
        let known = listing
            .providers
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(crate::error::ChatSyncError::Config(format!(
            "Unknown provider: {} (configured: {})",
            provider, known
        ))
        .into());
    }

    let selection = match model {
        Some(model) => ProviderSelection::with_model(&provider, model),
        None => ProviderSelection::new(&provider),
    };
    store.save(&selection)?;
    println!("{}", format!("Provider override saved: {}", provider).green());
    Ok(())
}

/// Remove the persisted override
pub fn clear() -> Result<()> {
    let store = OverrideStore::new()?;
    store.clear()?;
    println!(
        "{}",
        "Provider override cleared; backend preference applies.".green()
    );
    Ok(())
}
