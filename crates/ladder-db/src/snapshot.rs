//! Whole-ledger snapshot persistence.
//!
//! A snapshot is read and written as one unit. [`write`] is a
//! compare-and-swap on `ledger_meta.revision`; [`apply`] holds the write
//! lock across read, compute and commit. Rows are never deleted: a ledger
//! only grows, and status changes are updates in place.

use ladder_types::snapshot::LedgerSnapshot;
use rusqlite::{Connection, TransactionBehavior};

use crate::queries::{admin, audit, purchases, transactions, users};
use crate::{DbError, Result};

/// Result of [`apply`]: the closure's value and the revision committed, if
/// anything was written.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub committed_revision: Option<u64>,
}

/// Read the current snapshot and the revision it was taken at.
pub fn read(conn: &Connection) -> Result<LedgerSnapshot> {
    let tx = conn.unchecked_transaction()?;
    let snapshot = load(&tx)?;
    tx.commit()?;
    Ok(snapshot)
}

/// Commit `snapshot` if the store is still at `snapshot.revision`.
///
/// Returns the new revision. On [`DbError::Conflict`] nothing is written and
/// the caller must redo its operation from a fresh [`read`].
pub fn write(conn: &mut Connection, snapshot: &LedgerSnapshot) -> Result<u64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let found = current_revision(&tx)?;
    if found != snapshot.revision {
        tracing::warn!(expected = snapshot.revision, found, "stale snapshot write refused");
        return Err(DbError::Conflict {
            expected: snapshot.revision,
            found,
        });
    }
    let revision = store(&tx, snapshot, found)?;
    tx.commit()?;
    tracing::debug!(revision, "snapshot committed");
    Ok(revision)
}

/// Read, compute and write under one immediate transaction.
///
/// `f` returns the replacement snapshot (or `None` to write nothing) and a
/// value handed back to the caller. An error from `f` rolls everything back.
/// A replacement equal to what was read is not written.
pub fn apply<T, E, F>(conn: &mut Connection, f: F) -> std::result::Result<Applied<T>, E>
where
    E: From<DbError>,
    F: FnOnce(&LedgerSnapshot) -> std::result::Result<(Option<LedgerSnapshot>, T), E>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sqlite_err)?;
    let current = load(&tx).map_err(E::from)?;
    let (next, value) = f(&current)?;

    let committed_revision = match next {
        Some(next) if next != current => {
            let revision = store(&tx, &next, current.revision).map_err(E::from)?;
            tx.commit().map_err(sqlite_err)?;
            tracing::debug!(revision, "snapshot committed");
            Some(revision)
        }
        _ => None,
    };

    Ok(Applied {
        value,
        committed_revision,
    })
}

/// Pretty-printed JSON of the current snapshot, for backups and inspection.
pub fn export_json(conn: &Connection) -> Result<String> {
    let snapshot = read(conn)?;
    serde_json::to_string_pretty(&snapshot).map_err(|e| DbError::Serialization(e.to_string()))
}

fn sqlite_err<E: From<DbError>>(e: rusqlite::Error) -> E {
    E::from(DbError::Sqlite(e))
}

fn current_revision(conn: &Connection) -> Result<u64> {
    let revision: i64 = conn
        .query_row("SELECT revision FROM ledger_meta WHERE id = 1", [], |row| {
            row.get(0)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("ledger metadata".into()),
            other => DbError::Sqlite(other),
        })?;
    Ok(revision as u64)
}

fn load(conn: &Connection) -> Result<LedgerSnapshot> {
    Ok(LedgerSnapshot {
        users: users::list(conn)?,
        purchases: purchases::list(conn)?,
        transactions: transactions::list(conn)?,
        admin: admin::get(conn)?,
        logs: audit::list(conn)?,
        revision: current_revision(conn)?,
    })
}

/// Write every row of `snapshot` and bump the revision past `from`.
fn store(conn: &Connection, snapshot: &LedgerSnapshot, from: u64) -> Result<u64> {
    for user in &snapshot.users {
        users::upsert(conn, user)?;
    }
    for purchase in &snapshot.purchases {
        purchases::upsert(conn, purchase)?;
    }
    for txn in &snapshot.transactions {
        transactions::upsert(conn, txn)?;
    }
    admin::put(conn, &snapshot.admin)?;
    audit::replace(conn, &snapshot.logs)?;

    let revision = from + 1;
    conn.execute(
        "UPDATE ledger_meta SET revision = ?1 WHERE id = 1",
        [revision as i64],
    )?;
    Ok(revision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_types::audit::AuditEntry;
    use ladder_types::transaction::Transaction;
    use ladder_types::user::User;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn populated(base: &LedgerSnapshot) -> LedgerSnapshot {
        let mut next = base.clone();
        let mut alice = User::new("usr-a", "Alice", "ALICE", None, 1);
        alice.balance = 500;
        next.users.push(alice);
        next.users.push(User::new("usr-b", "Bob", "BOB", Some("ALICE".into()), 2));
        next.transactions
            .push(Transaction::recharge_request("usr-b", 700, 3));
        next.push_log(AuditEntry::new("TEST", "populated", "admin-1", 4));
        next
    }

    #[test]
    fn test_fresh_store_reads_default() {
        let conn = test_db();
        let snap = read(&conn).expect("read");
        assert_eq!(snap, LedgerSnapshot::default());
    }

    #[test]
    fn test_write_then_read() {
        let mut conn = test_db();
        let next = populated(&read(&conn).expect("read"));
        let revision = write(&mut conn, &next).expect("write");
        assert_eq!(revision, 1);

        let stored = read(&conn).expect("reread");
        assert_eq!(stored.revision, 1);
        assert_eq!(LedgerSnapshot { revision: 0, ..stored }, next);
    }

    #[test]
    fn test_stale_write_conflicts_and_writes_nothing() {
        let mut conn = test_db();
        let base = read(&conn).expect("read");

        let first = populated(&base);
        write(&mut conn, &first).expect("first writer");

        let mut second = base.clone();
        second.admin.income_frozen = true;
        let err = write(&mut conn, &second).expect_err("second writer is stale");
        assert!(matches!(err, DbError::Conflict { expected: 0, found: 1 }));

        let stored = read(&conn).expect("reread");
        assert!(!stored.admin.income_frozen);
        assert_eq!(stored.users.len(), 2);
    }

    #[test]
    fn test_apply_commits() {
        let mut conn = test_db();
        let applied = apply(&mut conn, |snap| {
            Ok::<_, DbError>((Some(populated(snap)), "done"))
        })
        .expect("apply");
        assert_eq!(applied.value, "done");
        assert_eq!(applied.committed_revision, Some(1));
        assert_eq!(read(&conn).expect("read").users.len(), 2);
    }

    #[test]
    fn test_apply_error_rolls_back() {
        let mut conn = test_db();
        let result: std::result::Result<Applied<()>, DbError> = apply(&mut conn, |_| {
            Err(DbError::NotFound("user 'usr-x'".into()))
        });
        assert!(result.is_err());
        assert_eq!(read(&conn).expect("read").revision, 0);
    }

    #[test]
    fn test_apply_unchanged_writes_nothing() {
        let mut conn = test_db();
        let applied = apply(&mut conn, |snap| Ok::<_, DbError>((Some(snap.clone()), ())))
            .expect("apply");
        assert_eq!(applied.committed_revision, None);

        let applied = apply(&mut conn, |_| Ok::<_, DbError>((None, 7))).expect("apply");
        assert_eq!(applied.value, 7);
        assert_eq!(applied.committed_revision, None);
        assert_eq!(read(&conn).expect("read").revision, 0);
    }

    #[test]
    fn test_export_json() {
        let mut conn = test_db();
        let next = populated(&read(&conn).expect("read"));
        write(&mut conn, &next).expect("write");

        let json = export_json(&conn).expect("export");
        let parsed: LedgerSnapshot = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed.revision, 1);
        assert_eq!(parsed.users[1].referred_by.as_deref(), Some("ALICE"));
        assert!(json.contains("\"type\": \"recharge\""));
    }
}
