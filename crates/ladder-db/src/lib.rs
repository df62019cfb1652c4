//! # ladder-db
//!
//! Ledger store on a single SQLite database at `$LADDER_DATA_DIR/ledger.db`.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - Amounts are stored as INTEGER minor units, timestamps as Unix seconds
//! - Enum values are stored as their lowercase text tags
//! - Schema version stored in `PRAGMA user_version`
//! - `ledger_meta.revision` counts committed snapshot writes and backs the
//!   compare-and-swap in [`snapshot::write`]

pub mod migrations;
pub mod queries;
pub mod schema;
pub mod snapshot;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Another writer committed since the snapshot was read. Re-read and
    /// redo the whole operation.
    #[error("snapshot conflict: read at revision {expected}, store is at {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the ledger database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = FULL;",
    )?;
    Ok(())
}
