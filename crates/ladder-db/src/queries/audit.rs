//! Audit log queries.

use ladder_types::audit::AuditEntry;
use ladder_types::AUDIT_LOG_CAP;
use rusqlite::Connection;

use crate::Result;

/// Replace the stored log with `entries` (oldest first).
pub fn replace(conn: &Connection, entries: &[AuditEntry]) -> Result<()> {
    conn.execute("DELETE FROM audit_log", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO audit_log (id, action, details, timestamp, actor_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let skip = entries.len().saturating_sub(AUDIT_LOG_CAP);
    for entry in &entries[skip..] {
        stmt.execute(rusqlite::params![
            entry.id,
            entry.action,
            entry.details,
            entry.timestamp as i64,
            entry.actor_id,
        ])?;
    }
    Ok(())
}

/// The stored log, oldest first.
pub fn list(conn: &Connection) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, action, details, timestamp, actor_id FROM audit_log ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(AuditEntry {
            id: row.get(0)?,
            action: row.get(1)?,
            details: row.get(2)?,
            timestamp: row.get::<_, i64>(3)? as u64,
            actor_id: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
