//! Inventory store layer.
//!
//! Every inventory record lives in a document store, addressed by item name.
//! [`InventoryStore`] is the port the controller talks to; two backends
//! implement it:
//!
//! - [`FirestoreStore`]: the hosted Firestore database over its REST API.
//! - [`SqliteStore`]: a local `SQLite` file with the same document layout.
//!
//! Nothing is cached here; every call is a round trip to the backend.

pub mod firestore;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::item::InventoryItem;

pub use firestore::FirestoreStore;
pub use sqlite::SqliteStore;

/// Errors reported by an inventory store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing service could not be reached or failed to answer.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused a write.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// A stored document could not be interpreted as an inventory item.
    #[error("invalid document '{name}': {message}")]
    InvalidDocument {
        /// Document key.
        name: String,
        /// What was wrong with it.
        message: String,
    },
}

impl StoreError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a write rejected error.
    #[must_use]
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected(message.into())
    }

    /// Create an invalid document error.
    #[must_use]
    pub fn invalid_document(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable key-value persistence of inventory items, keyed by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Return every persisted item. Order carries no meaning.
    ///
    /// Records that cannot be decoded are logged and left out.
    async fn list_all(&self) -> StoreResult<Vec<InventoryItem>>;

    /// Return the item stored under `name`, if any.
    async fn get(&self, name: &str) -> StoreResult<Option<InventoryItem>>;

    /// Create the record or overwrite its quantity.
    async fn upsert(&self, name: &str, quantity: u32) -> StoreResult<()>;

    /// Remove the record. Removing an absent record is not an error.
    async fn delete(&self, name: &str) -> StoreResult<()>;
}

/// Collect decoded items for a listing, skipping records that cannot be read.
///
/// A bad record must not hide the rest of the inventory, or stop it from
/// being deleted by name.
fn keep_decodable(
    results: impl IntoIterator<Item = StoreResult<InventoryItem>>,
) -> Vec<InventoryItem> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("Skipping unreadable inventory record: {err}");
                None
            }
        })
        .collect()
}

/// Build the store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the local database cannot be opened.
pub fn open(config: &Config) -> Result<Arc<dyn InventoryStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(config.database_path())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Firestore => {
            let store = FirestoreStore::new(&config.store.firestore, config.store_timeout());
            info!(
                "Using Firestore collection '{}' in project '{}'",
                config.store.firestore.collection, config.store.firestore.project_id
            );
            Ok(Arc::new(store))
        }
    }
}
