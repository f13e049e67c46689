//! `SQLite` schema definitions for the local inventory store.

/// SQL statement to create the inventory table.
///
/// One row per item; the name is the document key.
pub const CREATE_INVENTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS inventory (
    name TEXT PRIMARY KEY NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 0)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_INVENTORY_TABLE, CREATE_METADATA_TABLE];
