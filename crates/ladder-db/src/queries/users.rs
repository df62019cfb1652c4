//! User account queries.

use ladder_types::user::User;
use rusqlite::{Connection, Row};

use super::parse_tag;
use crate::{DbError, Result};

const COLUMNS: &str = "id, name, balance, withdrawable_balance, total_invested, total_withdrawn,
     referral_code, referred_by, status, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        balance: row.get(2)?,
        withdrawable_balance: row.get(3)?,
        total_invested: row.get(4)?,
        total_withdrawn: row.get(5)?,
        referral_code: row.get(6)?,
        referred_by: row.get(7)?,
        status: parse_tag(8, row.get(8)?)?,
        created_at: row.get::<_, i64>(9)? as u64,
    })
}

/// Insert a user or overwrite every mutable column of an existing one.
pub fn upsert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, balance, withdrawable_balance, total_invested,
                            total_withdrawn, referral_code, referred_by, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            balance = excluded.balance,
            withdrawable_balance = excluded.withdrawable_balance,
            total_invested = excluded.total_invested,
            total_withdrawn = excluded.total_withdrawn,
            referral_code = excluded.referral_code,
            referred_by = excluded.referred_by,
            status = excluded.status",
        rusqlite::params![
            user.id,
            user.name,
            user.balance,
            user.withdrawable_balance,
            user.total_invested,
            user.total_withdrawn,
            user.referral_code,
            user.referred_by,
            user.status.as_str(),
            user.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a user by id.
pub fn get(conn: &Connection, id: &str) -> Result<User> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        [id],
        from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("user '{id}'")),
        other => DbError::Sqlite(other),
    })
}

/// All users in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY rowid"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
