//! Application settings loaded from config.toml
//!
//! The file names the organization the bot serves, where the part catalog feed
//! lives, operation timeouts and the approval retry budget. `[[seed]]` entries
//! pre-populate the warehouse the first time the organization is created.
//! Secrets are never read from this file; they come from the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_PATH_ENV: &str = "STOCKROOM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The organization this instance serves
    pub organization: OrganizationSettings,
    /// Path to the JSON part catalog feed
    pub catalog_path: PathBuf,
    /// Upper bound for any single storage operation, in seconds
    pub request_timeout_secs: u64,
    /// How many times an approval is retried after losing an optimistic-concurrency race
    pub approval_retries: u32,
    /// Discord user ids allowed to approve claims and deposits; empty means anyone
    pub approvers: Vec<String>,
    /// Initial warehouse contents for a freshly created organization
    pub seed: Vec<SeedEntry>,
}

/// Organization identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrganizationSettings {
    /// Stable organization id
    pub id: String,
    /// Display name
    pub name: String,
}

/// One warehouse seed line
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Part SKU, must exist in the catalog
    pub sku: String,
    /// Initial on-hand quantity
    pub quantity: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            organization: OrganizationSettings::default(),
            catalog_path: PathBuf::from("data/parts.json"),
            request_timeout_secs: 10,
            approval_retries: 5,
            approvers: Vec::new(),
            seed: Vec::new(),
        }
    }
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default Organization".to_string(),
        }
    }
}

impl Settings {
    /// Timeout applied to every inventory operation.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether `user_id` may approve requests.
    #[must_use]
    pub fn can_approve(&self, user_id: &str) -> bool {
        self.approvers.is_empty() || self.approvers.iter().any(|id| id == user_id)
    }

    fn validate(self) -> Result<Self> {
        if self.organization.id.trim().is_empty() {
            return Err(Error::Config {
                message: "organization.id cannot be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config {
                message: "request_timeout_secs must be at least 1".to_string(),
            });
        }
        if self.approval_retries == 0 {
            return Err(Error::Config {
                message: "approval_retries must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.validate()
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML is invalid, or a value
/// is out of range.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    debug!("Loading settings from {:?}", path.as_ref());
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {:?}: {e}", path.as_ref()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `$STOCKROOM_CONFIG` or `./config.toml`, falling back to
/// defaults when no file exists.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        info!("No config file at {}, using defaults", path);
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            catalog_path = "parts.json"
            request_timeout_secs = 3
            approvers = ["1234"]

            [organization]
            id = "robotics"
            name = "Robotics Club"

            [[seed]]
            sku = "276-1234"
            quantity = 12
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.organization.id, "robotics");
        assert_eq!(settings.catalog_path, PathBuf::from("parts.json"));
        assert_eq!(settings.request_timeout(), Duration::from_secs(3));
        assert_eq!(settings.approval_retries, 5);
        assert_eq!(settings.seed.len(), 1);
        assert_eq!(settings.seed[0].quantity, 12);
        assert!(settings.can_approve("1234"));
        assert!(!settings.can_approve("5678"));
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.organization.id, "default");
        assert!(settings.approvers.is_empty());
        assert!(settings.can_approve("anyone"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = parse_settings("request_timeout_secs = 0");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
