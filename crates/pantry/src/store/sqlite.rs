//! Local `SQLite` inventory store.
//!
//! Mirrors the Firestore layout in a single table: one row per item, keyed by
//! name. Useful offline, for development, and as the default backend.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::item::InventoryItem;

use super::{keep_decodable, migrations, InventoryStore, StoreError, StoreResult};

/// Inventory store backed by a local `SQLite` database.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, shared by every operation.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create an inventory database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening inventory database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Inventory database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::unavailable("database connection lock poisoned"))
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<(String, SqlValue)> {
        Ok((row.get(0)?, row.get(1)?))
    }
}

/// Convert a raw row into an item, refusing anything but an integer in `u32` range.
fn into_item((name, quantity): (String, SqlValue)) -> StoreResult<InventoryItem> {
    let SqlValue::Integer(raw) = quantity else {
        return Err(StoreError::invalid_document(
            &name,
            format!("quantity is not an integer: {quantity:?}"),
        ));
    };
    let quantity = u32::try_from(raw).map_err(|_| {
        StoreError::invalid_document(&name, format!("quantity {raw} out of range"))
    })?;
    Ok(InventoryItem { name, quantity })
}

fn read_error(err: &rusqlite::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

fn write_error(err: &rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation | ErrorCode::ReadOnly) => {
            StoreError::write_rejected(err.to_string())
        }
        _ => StoreError::unavailable(err.to_string()),
    }
}

#[async_trait]
impl InventoryStore for SqliteStore {
    async fn list_all(&self) -> StoreResult<Vec<InventoryItem>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT name, quantity FROM inventory")
            .map_err(|e| read_error(&e))?;

        let rows = stmt
            .query_map([], Self::row_to_item)
            .map_err(|e| read_error(&e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| read_error(&e))?;

        Ok(keep_decodable(rows.into_iter().map(into_item)))
    }

    async fn get(&self, name: &str) -> StoreResult<Option<InventoryItem>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                "SELECT name, quantity FROM inventory WHERE name = ?1",
                [name],
                Self::row_to_item,
            )
            .optional()
            .map_err(|e| read_error(&e))?;

        row.map(into_item).transpose()
    }

    async fn upsert(&self, name: &str, quantity: u32) -> StoreResult<()> {
        let conn = self.connection()?;
        conn.execute(
            r"
            INSERT INTO inventory (name, quantity) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET quantity = excluded.quantity
            ",
            params![name, quantity],
        )
        .map_err(|e| write_error(&e))?;

        debug!("Stored {name} = {quantity}");
        Ok(())
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        let conn = self.connection()?;
        let affected = conn
            .execute("DELETE FROM inventory WHERE name = ?1", [name])
            .map_err(|e| write_error(&e))?;

        if affected == 0 {
            debug!("Delete of absent item {name} ignored");
        }
        Ok(())
    }
}
