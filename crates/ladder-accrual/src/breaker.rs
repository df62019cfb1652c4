//! Income freeze switch.
//!
//! While the admin freeze is set every accrual cycle is a no-op. Purchases
//! keep their remaining days, so lifting the freeze resumes them where they
//! stopped.

use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::Timestamp;

/// Set or lift the income freeze. Returns the updated ledger; an unchanged
/// flag returns an identical copy with no audit entry.
pub fn set_income_frozen(
    snapshot: &LedgerSnapshot,
    frozen: bool,
    actor: &str,
    now: Timestamp,
) -> LedgerSnapshot {
    let mut next = snapshot.clone();
    if next.admin.income_frozen == frozen {
        return next;
    }
    next.admin.income_frozen = frozen;

    if frozen {
        tracing::warn!(actor, "income distribution frozen");
        next.push_log(AuditEntry::new(
            "INCOME_FROZEN",
            "Daily income distribution frozen",
            actor,
            now,
        ));
    } else {
        tracing::info!(actor, "income distribution resumed");
        next.push_log(AuditEntry::new(
            "INCOME_RESUMED",
            "Daily income distribution resumed",
            actor,
            now,
        ));
    }
    next
}
