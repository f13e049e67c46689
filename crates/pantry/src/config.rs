//! Configuration management for pantry.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::controller::RemoveMode;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "pantry";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "inventory.db";

/// Environment variable consulted when no recipe API key is configured.
const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PANTRY_`, sections split on `__`)
/// 2. TOML config file at `~/.config/pantry/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory store configuration.
    pub store: StoreConfig,
    /// Inventory controller behaviour.
    pub inventory: InventoryConfig,
    /// Recipe suggestion configuration.
    pub recipe: RecipeConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Which backend holds the inventory documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Local `SQLite` database file.
    #[default]
    Sqlite,
    /// Hosted Firestore database over its REST API.
    Firestore,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Firestore => write!(f, "firestore"),
        }
    }
}

/// Store-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use.
    pub backend: StoreBackend,
    /// Path to the local database file.
    /// Defaults to `~/.local/share/pantry/inventory.db`
    pub database_path: Option<PathBuf>,
    /// Request timeout for remote backends, in seconds.
    pub timeout_secs: u64,
    /// Firestore settings, used when `backend = "firestore"`.
    pub firestore: FirestoreConfig,
}

/// Firestore connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Web API key appended to requests, if the database requires one.
    /// Never written out when the configuration is serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the Firestore REST API.
    pub base_url: String,
    /// Database id within the project.
    pub database: String,
    /// Collection holding one document per item.
    pub collection: String,
}

/// Inventory controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// What `remove` does when no mode is given explicitly.
    pub remove_mode: RemoveMode,
}

/// Recipe suggestion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    /// API key for the completion service. Falls back to `OPENAI_API_KEY`.
    /// Never written out when the configuration is serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the completion service.
    pub base_url: String,
    /// Completion model name.
    pub model: String,
    /// Token budget for a single suggestion.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_path: None, // Will be resolved to default at runtime
            timeout_secs: 10,
            firestore: FirestoreConfig::default(),
        }
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: None,
            base_url: "https://firestore.googleapis.com".to_string(),
            database: "(default)".to_string(),
            collection: "inventory".to_string(),
        }
    }
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 100,
            timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PANTRY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Firestore
            && self.store.firestore.project_id.trim().is_empty()
        {
            return Err(Error::ConfigValidation {
                message: "store.firestore.project_id is required for the firestore backend"
                    .to_string(),
            });
        }

        if self.store.firestore.collection.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "store.firestore.collection cannot be empty".to_string(),
            });
        }

        if self.store.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "store.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.recipe.max_tokens == 0 {
            return Err(Error::ConfigValidation {
                message: "recipe.max_tokens must be greater than 0".to_string(),
            });
        }

        if self.recipe.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "recipe.timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the store request timeout as a Duration.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Get the recipe request timeout as a Duration.
    #[must_use]
    pub fn recipe_timeout(&self) -> Duration {
        Duration::from_secs(self.recipe.timeout_secs)
    }

    /// Get the completion API key, falling back to `OPENAI_API_KEY`.
    #[must_use]
    pub fn recipe_api_key(&self) -> Option<String> {
        self.recipe
            .api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_VAR).ok())
            .filter(|key| !key.is_empty())
    }

    /// Get the address the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
