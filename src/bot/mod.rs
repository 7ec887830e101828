//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for Stockroom, including all
//! slash commands, autocomplete handlers, the approver check, and the
//! framework setup.

/// Discord command implementations (warehouse, claim, deposit, shopping, ...)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    core::{events::WarehouseChanged, inventory::AppInventory},
    errors::{Error, ErrorKind, Result},
};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, instrument, warn};

/// Shared data available to all bot commands.
/// Every command reaches the core through the inventory service.
pub struct BotData {
    /// Inventory service shared with the rest of the process
    pub inventory: Arc<AppInventory>,
}

impl BotData {
    /// Creates a new `BotData` around the inventory service.
    #[must_use]
    pub const fn new(inventory: Arc<AppInventory>) -> Self {
        Self { inventory }
    }

    /// The organization every command operates on.
    #[must_use]
    pub fn org(&self) -> &str {
        self.inventory.default_org()
    }
}

/// Command check: only configured approvers may approve or reject requests.
/// An empty approver list lets everyone through.
pub async fn is_approver(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
    let user_id = ctx.author().id.to_string();
    Ok(ctx.data().inventory.settings().can_approve(&user_id))
}

/// User-facing text for an error, chosen by its [`ErrorKind`].
#[must_use]
pub fn user_message(error: &Error) -> String {
    match error.kind() {
        ErrorKind::Validation => format!("❌ {error}"),
        ErrorKind::NotFound => format!("❌ {error}. It may have been removed; try listing again."),
        ErrorKind::InvalidState => format!("⚠️ {error}"),
        ErrorKind::Conflict => format!("⚠️ {error}. Please try again."),
        ErrorKind::Transport => {
            "❌ The request could not be completed right now. Please try again later.".to_string()
        }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.kind() == ErrorKind::Transport {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
            } else {
                warn!("Command `{}` rejected: {}", ctx.command().name, error);
            }
            if let Err(e) = ctx.say(user_message(&error)).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { ctx, .. } => {
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .content("❌ You are not allowed to approve or reject requests.")
                        .ephemeral(true),
                )
                .await
            {
                error!("Failed to send check failure: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn log_warehouse_changes(mut events: broadcast::Receiver<WarehouseChanged>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(
                "Warehouse of {} changed: {}",
                event.org_id,
                event.skus.join(", ")
            ),
            Err(RecvError::Lagged(missed)) => warn!("Missed {} warehouse events", missed),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Every command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::ping(),
        commands::help(),
        commands::dashboard(),
        commands::warehouse(),
        commands::claim(),
        commands::deposit(),
        commands::shopping(),
        commands::catalog(),
        commands::archive(),
    ]
}

/// Builds the poise framework and runs the Discord client until it stops.
#[instrument(skip(token, inventory))]
pub async fn run_bot(token: String, inventory: Arc<AppInventory>) -> Result<()> {
    tokio::spawn(log_warehouse_changes(inventory.subscribe()));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(inventory))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_by_kind() {
        let validation = user_message(&Error::UnknownSku {
            sku: "Z".to_string(),
        });
        assert!(validation.contains("Unknown SKU 'Z'"));

        let missing = user_message(&Error::ClaimNotFound {
            id: "c1".to_string(),
        });
        assert!(missing.contains("try listing again"));

        let conflict = user_message(&Error::Conflict { attempts: 3 });
        assert!(conflict.contains("try again"));

        let transport = user_message(&Error::Timeout { seconds: 10 });
        assert!(!transport.contains("10"));
    }

    #[test]
    fn test_all_commands_registered() {
        let names: Vec<String> = all_commands().into_iter().map(|c| c.name).collect();
        for expected in [
            "ping",
            "help",
            "dashboard",
            "warehouse",
            "claim",
            "deposit",
            "shopping",
            "catalog",
            "archive",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
