//! Error types for pantry.
//!
//! This module defines the crate-level error type. The store and completion
//! ports carry their own narrower error enums ([`StoreError`] and
//! [`RecipeError`]) which are wrapped here when they reach a caller.

use std::path::PathBuf;
use thiserror::Error;

use crate::recipe::RecipeError;
use crate::store::StoreError;

/// The main error type for pantry operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Inventory Errors ===
    /// A controller operation failed because the store did.
    #[error("{operation} failed: {source}")]
    OperationFailed {
        /// Name of the operation that failed (e.g. `add_item`).
        operation: &'static str,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    // === Recipe Errors ===
    /// The completion API call behind the recipe endpoint failed.
    #[error("recipe suggestion failed: {0}")]
    UpstreamRecipeFailure(#[from] RecipeError),

    // === Storage Errors ===
    /// Failed to open or create the local database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A local database statement failed outside of a store operation.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Server Errors ===
    /// The HTTP server could not bind or stopped unexpectedly.
    #[error("server error on {address}: {source}")]
    Server {
        /// Address the server was bound to.
        address: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for pantry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Wrap a store error as the failure of the named operation.
    #[must_use]
    pub fn operation_failed(operation: &'static str, source: StoreError) -> Self {
        Self::OperationFailed { operation, source }
    }

    /// Check if this error was caused by the store being unreachable.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Self::OperationFailed {
                source: StoreError::Unavailable(_),
                ..
            }
        )
    }

    /// Check if this error was caused by the store rejecting a write.
    #[must_use]
    pub fn is_write_rejected(&self) -> bool {
        matches!(
            self,
            Self::OperationFailed {
                source: StoreError::WriteRejected(_),
                ..
            }
        )
    }
}
