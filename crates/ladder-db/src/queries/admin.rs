//! Admin configuration row.

use ladder_types::admin::AdminConfig;
use rusqlite::Connection;

use crate::{DbError, Result};

/// Read the single configuration row.
pub fn get(conn: &Connection) -> Result<AdminConfig> {
    conn.query_row(
        "SELECT income_frozen, automatic_income_enabled, automatic_income_time,
                last_income_run, commission_l1, commission_l2, commission_l3, min_withdrawal
         FROM admin_config WHERE id = 1",
        [],
        |row| {
            Ok(AdminConfig {
                income_frozen: row.get(0)?,
                automatic_income_enabled: row.get(1)?,
                automatic_income_time: row.get(2)?,
                last_income_run: row.get(3)?,
                commission_l1: row.get(4)?,
                commission_l2: row.get(5)?,
                commission_l3: row.get(6)?,
                min_withdrawal: row.get(7)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("admin config".into()),
        other => DbError::Sqlite(other),
    })
}

/// Replace the configuration row.
pub fn put(conn: &Connection, admin: &AdminConfig) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO admin_config (id, income_frozen, automatic_income_enabled,
            automatic_income_time, last_income_run, commission_l1, commission_l2,
            commission_l3, min_withdrawal)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            admin.income_frozen,
            admin.automatic_income_enabled,
            admin.automatic_income_time,
            admin.last_income_run,
            admin.commission_l1,
            admin.commission_l2,
            admin.commission_l3,
            admin.min_withdrawal,
        ],
    )?;
    Ok(())
}

/// Flip the income breaker without going through a full snapshot write.
pub fn set_income_frozen(conn: &Connection, frozen: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE admin_config SET income_frozen = ?1 WHERE id = 1",
        [frozen],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound("admin config".into()));
    }
    Ok(())
}
