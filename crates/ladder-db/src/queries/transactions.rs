//! Ledger entry queries. `seq` preserves append order across rewrites.

use ladder_types::transaction::Transaction;
use rusqlite::{Connection, Row};

use super::parse_tag;
use crate::{DbError, Result};

const COLUMNS: &str =
    "id, user_id, type, amount, status, source_purchase_id, level, details, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parse_tag(2, row.get(2)?)?,
        amount: row.get(3)?,
        status: parse_tag(4, row.get(4)?)?,
        source_purchase_id: row.get(5)?,
        level: row.get(6)?,
        details: row.get(7)?,
        created_at: row.get::<_, i64>(8)? as u64,
    })
}

/// Append a new entry, or update status and details of an existing one.
/// Updating keeps the original `seq`.
pub fn upsert(conn: &Connection, txn: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, user_id, type, amount, status, source_purchase_id,
                                   level, details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            details = excluded.details",
        rusqlite::params![
            txn.id,
            txn.user_id,
            txn.kind.as_str(),
            txn.amount,
            txn.status.as_str(),
            txn.source_purchase_id,
            txn.level,
            txn.details,
            txn.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get one entry by id.
pub fn get(conn: &Connection, id: &str) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("transaction '{id}'")),
        other => DbError::Sqlite(other),
    })
}

/// All entries in append order.
pub fn list(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions ORDER BY seq"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Entries generated by one purchase, in append order.
pub fn by_source_purchase(conn: &Connection, purchase_id: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions WHERE source_purchase_id = ?1 ORDER BY seq"
    ))?;
    let rows = stmt.query_map([purchase_id], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
