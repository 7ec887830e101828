/// Database configuration and connection management
pub mod database;

/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{OrganizationSettings, SeedEntry, Settings, load_default_settings, load_settings};
