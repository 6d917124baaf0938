//! Application configuration loading from config.toml
//!
//! The configuration file carries the store settings (database path,
//! session idle timeout) plus the catalogue seed entries used to populate
//! the products table on first run.

/// Catalogue seed entries from config.toml
pub mod catalogue;

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Store-wide settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Catalogue entries to seed on startup (may be empty)
    #[serde(default)]
    pub products: Vec<catalogue::ProductSeed>,
}

/// Store-wide settings from the `[store]` table
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Seconds of inactivity after which a session expires
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
}

fn default_database_path() -> String {
    "data/shopfront.sqlite".to_string()
}

const fn default_session_ttl_secs() -> i64 {
    crate::core::session::DEFAULT_IDLE_TTL_SECS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Resolves the database path, preferring the `DATABASE_PATH`
    /// environment variable over the configured value.
    pub fn database_path(&self) -> String {
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| self.store.database_path.clone())
    }
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads application configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [store]
            database_path = "data/test.sqlite"
            session_ttl_secs = 600

            [[products]]
            name = "Mug"
            description = "Stoneware mug"
            price = 850
            stock = 40

            [[products]]
            name = "Poster"
            description = "A2 print"
            price = 1200
            stock = 15
            image = "poster.png"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.database_path, "data/test.sqlite");
        assert_eq!(config.store.session_ttl_secs, 600);
        assert_eq!(config.products.len(), 2);
        assert_eq!(config.products[0].name, "Mug");
        assert_eq!(config.products[0].price, 850);
        assert!(config.products[0].image.is_none());
        assert_eq!(config.products[1].image.as_deref(), Some("poster.png"));
    }

    #[test]
    fn test_defaults_apply_when_sections_missing() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.database_path, "data/shopfront.sqlite");
        assert_eq!(config.store.session_ttl_secs, 900);
        assert!(config.products.is_empty());
    }
}
