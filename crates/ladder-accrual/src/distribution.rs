//! Income distribution cycle.
//!
//! For each purchase that is active with days remaining:
//!
//! ```text
//! owner.withdrawable_balance += purchase.daily_income
//! purchase.days_remaining    -= 1      (0 => completed)
//! ```
//!
//! and one approved `profit` entry tagged with the purchase id is written.
//! Purchases of frozen or banned owners are skipped without aging, so the
//! plan pauses instead of losing the day.
//!
//! The cycle performs no date bookkeeping. Running it twice on the same day
//! pays twice; the [`crate::scheduler`] gate prevents that.

use std::collections::BTreeSet;

use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::Transaction;
use ladder_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{AccrualError, Result};

/// Totals for one accrual cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualStats {
    pub total_distributed: Amount,
    /// Distinct users credited.
    pub users_affected: usize,
    pub purchases_processed: usize,
    /// Accruing purchases passed over because the owner is not active.
    pub purchases_skipped: usize,
}

#[derive(Clone, Debug)]
pub struct AccrualOutcome {
    /// The ledger after the cycle; persist this.
    pub snapshot: LedgerSnapshot,
    pub stats: AccrualStats,
}

/// Run one accrual cycle over `snapshot`.
///
/// Returns zero stats and an unchanged ledger while the admin income freeze
/// is set.
///
/// # Errors
///
/// - [`AccrualError::UserNotFound`] if an accruing purchase has no owner
/// - [`AccrualError::Overflow`] on arithmetic overflow
pub fn run_accrual_cycle(
    snapshot: &LedgerSnapshot,
    actor: &str,
    now: Timestamp,
) -> Result<AccrualOutcome> {
    if snapshot.admin.income_frozen {
        tracing::info!("income frozen, accrual cycle skipped");
        return Ok(AccrualOutcome {
            snapshot: snapshot.clone(),
            stats: AccrualStats::default(),
        });
    }

    let mut next = snapshot.clone();
    let mut stats = AccrualStats::default();
    let mut credited = BTreeSet::new();
    let mut profits = Vec::new();

    for purchase in next.purchases.iter_mut().filter(|p| p.is_accruing()) {
        let owner = next
            .users
            .iter_mut()
            .find(|u| u.id == purchase.user_id)
            .ok_or_else(|| AccrualError::UserNotFound {
                purchase_id: purchase.id.clone(),
                user_id: purchase.user_id.clone(),
            })?;

        if !owner.is_active() {
            tracing::debug!(
                purchase = %purchase.id,
                user = %owner.id,
                status = %owner.status,
                "owner not active, purchase paused"
            );
            stats.purchases_skipped += 1;
            continue;
        }

        owner.withdrawable_balance = owner
            .withdrawable_balance
            .checked_add(purchase.daily_income)
            .ok_or(AccrualError::Overflow)?;

        let day = purchase.total_days.saturating_sub(purchase.days_remaining) + 1;
        profits.push(Transaction::profit(
            &owner.id,
            &purchase.id,
            purchase.daily_income,
            format!(
                "Daily income from {} (day {day}/{})",
                purchase.plan_name, purchase.total_days
            ),
            now,
        ));

        purchase.age_one_day();

        stats.total_distributed = stats
            .total_distributed
            .checked_add(purchase.daily_income)
            .ok_or(AccrualError::Overflow)?;
        stats.purchases_processed += 1;
        credited.insert(owner.id.clone());
    }

    stats.users_affected = credited.len();
    next.transactions.extend(profits);

    if stats.purchases_processed > 0 {
        next.push_log(AuditEntry::new(
            "INCOME_DISTRIBUTED",
            format!(
                "Distributed {} to {} users across {} purchases",
                stats.total_distributed, stats.users_affected, stats.purchases_processed
            ),
            actor,
            now,
        ));
    }

    tracing::info!(
        total = stats.total_distributed,
        users = stats.users_affected,
        processed = stats.purchases_processed,
        skipped = stats.purchases_skipped,
        "accrual cycle complete"
    );

    Ok(AccrualOutcome {
        snapshot: next,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_types::purchase::{Purchase, PurchaseStatus};
    use ladder_types::transaction::TransactionKind;
    use ladder_types::user::{User, UserStatus};

    fn purchase(id: &str, user_id: &str, daily: Amount, days: u32) -> Purchase {
        Purchase {
            id: id.into(),
            user_id: user_id.into(),
            plan_name: "Plan".into(),
            price: 100,
            daily_income: daily,
            days_remaining: days,
            total_days: days,
            status: PurchaseStatus::Active,
            funded_by_txn_id: None,
            created_at: 0,
        }
    }

    fn ledger() -> LedgerSnapshot {
        let mut ledger = LedgerSnapshot::default();
        ledger.users.push(User::new("usr-1", "One", "ONE", None, 0));
        ledger.users.push(User::new("usr-2", "Two", "TWO", None, 0));
        ledger.purchases.push(purchase("pur-1", "usr-1", 10, 3));
        ledger.purchases.push(purchase("pur-2", "usr-1", 5, 1));
        ledger.purchases.push(purchase("pur-3", "usr-2", 7, 2));
        ledger
    }

    #[test]
    fn test_cycle_credits_and_ages() {
        let outcome = run_accrual_cycle(&ledger(), "system", 100).expect("cycle");
        let next = &outcome.snapshot;

        assert_eq!(outcome.stats.total_distributed, 22);
        assert_eq!(outcome.stats.users_affected, 2);
        assert_eq!(outcome.stats.purchases_processed, 3);
        assert_eq!(next.user("usr-1").expect("user").withdrawable_balance, 15);
        assert_eq!(next.user("usr-2").expect("user").withdrawable_balance, 7);

        assert_eq!(next.purchase("pur-1").expect("p1").days_remaining, 2);
        let p2 = next.purchase("pur-2").expect("p2");
        assert_eq!(p2.days_remaining, 0);
        assert_eq!(p2.status, PurchaseStatus::Completed);

        let profits: Vec<_> = next
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Profit)
            .collect();
        assert_eq!(profits.len(), 3);
        assert!(profits.iter().all(|t| t.source_purchase_id.is_some() && t.is_approved()));
        assert_eq!(next.logs.len(), 1);
        assert_eq!(next.logs[0].action, "INCOME_DISTRIBUTED");
    }

    #[test]
    fn test_income_frozen_is_noop() {
        let mut input = ledger();
        input.admin.income_frozen = true;
        let outcome = run_accrual_cycle(&input, "system", 100).expect("cycle");
        assert_eq!(outcome.stats, AccrualStats::default());
        assert_eq!(outcome.snapshot, input);
    }

    #[test]
    fn test_frozen_owner_pauses_plan() {
        let mut input = ledger();
        input.user_mut("usr-2").expect("user").status = UserStatus::Frozen;
        let outcome = run_accrual_cycle(&input, "system", 100).expect("cycle");

        assert_eq!(outcome.stats.purchases_skipped, 1);
        assert_eq!(outcome.stats.users_affected, 1);
        let p3 = outcome.snapshot.purchase("pur-3").expect("p3");
        assert_eq!(p3.days_remaining, 2, "skipped day must not be consumed");
        assert_eq!(
            outcome.snapshot.user("usr-2").expect("user").withdrawable_balance,
            0
        );
    }

    #[test]
    fn test_completed_and_cancelled_are_ignored() {
        let mut input = ledger();
        input.purchase_mut("pur-1").expect("p1").status = PurchaseStatus::Cancelled;
        input.purchase_mut("pur-3").expect("p3").status = PurchaseStatus::Completed;
        let outcome = run_accrual_cycle(&input, "system", 100).expect("cycle");
        assert_eq!(outcome.stats.purchases_processed, 1);
        assert_eq!(outcome.stats.total_distributed, 5);
    }

    #[test]
    fn test_orphaned_purchase_aborts_without_mutation() {
        let mut input = ledger();
        input.purchases.push(purchase("pur-9", "usr-missing", 10, 3));
        let err = run_accrual_cycle(&input, "system", 100).expect_err("orphan");
        assert!(matches!(err, AccrualError::UserNotFound { .. }));
        assert_eq!(input.user("usr-1").expect("user").withdrawable_balance, 0);
    }

    #[test]
    fn test_inconsistent_term_does_not_underflow() {
        let mut input = ledger();
        input.purchases.clear();
        let mut stretched = purchase("pur-4", "usr-1", 10, 5);
        stretched.total_days = 3;
        input.purchases.push(stretched);

        let outcome = run_accrual_cycle(&input, "system", 100).expect("cycle");
        assert_eq!(outcome.stats.total_distributed, 10);
        assert_eq!(outcome.snapshot.purchase("pur-4").expect("p4").days_remaining, 4);
        let profit = outcome
            .snapshot
            .transactions
            .iter()
            .find(|t| t.kind == TransactionKind::Profit)
            .expect("profit");
        assert!(profit.details.contains("day 1/3"));
    }

    #[test]
    fn test_empty_cycle_writes_no_log() {
        let mut input = ledger();
        input.purchases.clear();
        let outcome = run_accrual_cycle(&input, "system", 100).expect("cycle");
        assert!(outcome.snapshot.logs.is_empty());
        assert_eq!(outcome.stats.purchases_processed, 0);
    }
}
