use dotenvy::dotenv;
use std::{env, sync::Arc};
use stockroom::{
    bot,
    config::{self, database},
    core::{catalog::JsonFileSource, inventory::Inventory},
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings
    let settings = config::load_default_settings()
        .inspect_err(|e| error!("Critical error loading settings: {}", e))?;
    info!(
        "Serving organization '{}' ({})",
        settings.organization.name, settings.organization.id
    );

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Build the inventory service and make sure the organization exists
    let source = JsonFileSource::new(settings.catalog_path.clone());
    let inventory = Arc::new(Inventory::new(db, source, Arc::new(settings)));
    inventory
        .bootstrap()
        .await
        .inspect_err(|e| error!("Failed to bootstrap organization: {}", e))?;

    // 6. Run the bot
    // DISCORD_BOT_TOKEN is read directly before use, never stored in settings
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, inventory).await
}
