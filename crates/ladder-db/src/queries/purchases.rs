//! Plan purchase queries.

use ladder_types::purchase::Purchase;
use rusqlite::{Connection, Row};

use super::parse_tag;
use crate::Result;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan_name: row.get(2)?,
        price: row.get(3)?,
        daily_income: row.get(4)?,
        days_remaining: row.get(5)?,
        total_days: row.get(6)?,
        status: parse_tag(7, row.get(7)?)?,
        funded_by_txn_id: row.get(8)?,
        created_at: row.get::<_, i64>(9)? as u64,
    })
}

/// Insert a purchase or update its lifecycle columns.
pub fn upsert(conn: &Connection, purchase: &Purchase) -> Result<()> {
    conn.execute(
        "INSERT INTO purchases (id, user_id, plan_name, price, daily_income, days_remaining,
                                total_days, status, funded_by_txn_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            days_remaining = excluded.days_remaining,
            status = excluded.status,
            funded_by_txn_id = excluded.funded_by_txn_id",
        rusqlite::params![
            purchase.id,
            purchase.user_id,
            purchase.plan_name,
            purchase.price,
            purchase.daily_income,
            purchase.days_remaining,
            purchase.total_days,
            purchase.status.as_str(),
            purchase.funded_by_txn_id,
            purchase.created_at as i64,
        ],
    )?;
    Ok(())
}

/// All purchases in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<Purchase>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, plan_name, price, daily_income, days_remaining, total_days,
                status, funded_by_txn_id, created_at
         FROM purchases ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Purchases attributed to one recharge.
pub fn funded_by(conn: &Connection, recharge_txn_id: &str) -> Result<Vec<Purchase>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, plan_name, price, daily_income, days_remaining, total_days,
                status, funded_by_txn_id, created_at
         FROM purchases WHERE funded_by_txn_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map([recharge_txn_id], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
