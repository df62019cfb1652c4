//! Reversal commit.
//!
//! Applies a [`ReversalPlan`] to a clone of the ledger:
//!
//! 1. deduct the recharge amount from the depositor's principal;
//! 2. cancel each traced purchase, reject its profit entries and take the
//!    amounts back from the owner's withdrawable balance;
//! 3. reject its commission entries and take them back from each upline;
//! 4. reject the recharge;
//! 5. freeze every active user the reversal left with a negative balance;
//! 6. write one `FRAUD_REVERSAL` audit entry.
//!
//! Negative balances are kept as they are. They mark the account for manual
//! review together with the freeze.

use std::collections::BTreeSet;

use ladder_types::audit::AuditEntry;
use ladder_types::purchase::PurchaseStatus;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::user::UserStatus;
use ladder_types::{Amount, Timestamp};

use crate::plan::{trace, ReversalImpact, ReversalPlan};
use crate::{Result, ReversalError};

#[derive(Clone, Debug)]
pub struct ReversalOutcome {
    /// The ledger after the reversal; persist this.
    pub snapshot: LedgerSnapshot,
    pub impact: ReversalImpact,
    pub cancelled_purchases: Vec<String>,
    /// Users moved from active to frozen by this reversal.
    pub frozen_users: Vec<String>,
}

/// Reverse the approved recharge `recharge_txn_id` and everything it funded.
///
/// # Errors
///
/// - any error from [`trace`]
/// - [`ReversalError::UserNotFound`] if a traced entry's owner is missing
/// - [`ReversalError::Overflow`] on arithmetic overflow
pub fn apply_reversal(
    snapshot: &LedgerSnapshot,
    recharge_txn_id: &str,
    actor: &str,
    now: Timestamp,
) -> Result<ReversalOutcome> {
    let plan = trace(snapshot, recharge_txn_id)?;
    let mut next = snapshot.clone();
    let mut touched = BTreeSet::new();
    let reason = format!("Reversed: funded by fraudulent recharge {recharge_txn_id}");

    debit(&mut next, &plan.user_id, Debit::Principal, plan.impact.recharge_amount)?;
    touched.insert(plan.user_id.clone());

    let mut cancelled_purchases = Vec::with_capacity(plan.purchases.len());
    for clawback in &plan.purchases {
        if let Some(purchase) = next.purchase_mut(&clawback.purchase_id) {
            purchase.status = PurchaseStatus::Cancelled;
        }
        cancelled_purchases.push(clawback.purchase_id.clone());

        for txn_id in clawback
            .profit_txn_ids
            .iter()
            .chain(clawback.commission_txn_ids.iter())
        {
            let (user_id, amount) = reject_entry(&mut next, txn_id, &reason)?;
            debit(&mut next, &user_id, Debit::Earnings, amount)?;
            touched.insert(user_id);
        }
    }

    reject_entry(&mut next, &plan.recharge_txn_id, "Fraud reversal")?;

    let frozen_users = freeze_negative(&mut next, &touched);

    next.push_log(AuditEntry::new(
        "FRAUD_REVERSAL",
        summary(&plan, actor, &frozen_users),
        actor,
        now,
    ));

    tracing::warn!(
        recharge = %plan.recharge_txn_id,
        user = %plan.user_id,
        actor,
        total = plan.impact.total_deduction,
        purchases = cancelled_purchases.len(),
        commissions = plan.commissions_count(),
        frozen = frozen_users.len(),
        "recharge reversed"
    );

    Ok(ReversalOutcome {
        snapshot: next,
        impact: plan.impact,
        cancelled_purchases,
        frozen_users,
    })
}

#[derive(Clone, Copy)]
enum Debit {
    Principal,
    Earnings,
}

fn debit(
    ledger: &mut LedgerSnapshot,
    user_id: &str,
    from: Debit,
    amount: Amount,
) -> Result<()> {
    let user = ledger
        .user_mut(user_id)
        .ok_or_else(|| ReversalError::UserNotFound(user_id.to_string()))?;
    let field = match from {
        Debit::Principal => &mut user.balance,
        Debit::Earnings => &mut user.withdrawable_balance,
    };
    *field = field.checked_sub(amount).ok_or(ReversalError::Overflow)?;
    Ok(())
}

/// Mark one entry rejected, returning its owner and amount.
fn reject_entry(
    ledger: &mut LedgerSnapshot,
    txn_id: &str,
    reason: &str,
) -> Result<(String, Amount)> {
    let txn = ledger
        .transaction_mut(txn_id)
        .ok_or_else(|| ReversalError::NotFound(txn_id.to_string()))?;
    txn.reject(reason);
    Ok((txn.user_id.clone(), txn.amount))
}

fn freeze_negative(ledger: &mut LedgerSnapshot, touched: &BTreeSet<String>) -> Vec<String> {
    let mut frozen = Vec::new();
    for user in ledger
        .users
        .iter_mut()
        .filter(|u| touched.contains(&u.id))
    {
        if user.has_negative_balance() && user.status == UserStatus::Active {
            user.status = UserStatus::Frozen;
            tracing::warn!(
                user = %user.id,
                balance = user.balance,
                withdrawable = user.withdrawable_balance,
                "negative balance after reversal, account frozen"
            );
            frozen.push(user.id.clone());
        }
    }
    frozen
}

fn summary(plan: &ReversalPlan, actor: &str, frozen: &[String]) -> String {
    format!(
        "Reversed recharge {} of {} for user {} by {actor}: deducted {} total, \
         cancelled {} purchases, clawed back {} profits and {} commissions, froze {} users",
        plan.recharge_txn_id,
        plan.impact.recharge_amount,
        plan.user_id,
        plan.impact.total_deduction,
        plan.purchases.len(),
        plan.profits_count(),
        plan.commissions_count(),
        frozen.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::compute_impact;
    use ladder_types::purchase::Purchase;
    use ladder_types::transaction::{Transaction, TransactionKind, TransactionStatus};
    use ladder_types::user::User;

    /// Depositor with `balance` / `withdrawable`, one active purchase funded
    /// by a 1000 recharge, two profits of 10 and one 250 commission upstream.
    fn fixture(balance: Amount, withdrawable: Amount) -> (LedgerSnapshot, String) {
        let mut ledger = LedgerSnapshot::default();
        let mut up = User::new("usr-up", "Up", "UP", None, 0);
        up.withdrawable_balance = 1000;
        ledger.users.push(up);
        let mut user = User::new("usr-1", "One", "ONE", Some("UP".into()), 0);
        user.balance = balance;
        user.withdrawable_balance = withdrawable;
        ledger.users.push(user);

        let mut recharge = Transaction::recharge_request("usr-1", 1000, 0);
        recharge.status = TransactionStatus::Approved;
        let recharge_id = recharge.id.clone();
        ledger.transactions.push(recharge);

        ledger.purchases.push(Purchase {
            id: "pur-1".into(),
            user_id: "usr-1".into(),
            plan_name: "Plan".into(),
            price: 1000,
            daily_income: 10,
            days_remaining: 8,
            total_days: 10,
            status: PurchaseStatus::Active,
            funded_by_txn_id: Some(recharge_id.clone()),
            created_at: 0,
        });
        ledger
            .transactions
            .push(Transaction::commission("usr-up", "pur-1", 1, 250, String::new(), 0));
        ledger
            .transactions
            .push(Transaction::profit("usr-1", "pur-1", 10, String::new(), 0));
        ledger
            .transactions
            .push(Transaction::profit("usr-1", "pur-1", 10, String::new(), 0));
        (ledger, recharge_id)
    }

    fn approved_sum(ledger: &LedgerSnapshot, kind: TransactionKind, purchase_id: &str) -> Amount {
        ledger
            .transactions
            .iter()
            .filter(|t| t.is_approved_earning_of(kind, purchase_id))
            .map(|t| t.amount)
            .sum()
    }

    #[test]
    fn test_full_reversal() {
        let (ledger, recharge_id) = fixture(5000, 500);
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");
        let next = &outcome.snapshot;

        let user = next.user("usr-1").expect("user");
        assert_eq!(user.balance, 4000);
        assert_eq!(user.withdrawable_balance, 480);
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(next.user("usr-up").expect("up").withdrawable_balance, 750);

        assert_eq!(next.purchase("pur-1").expect("purchase").status, PurchaseStatus::Cancelled);
        assert_eq!(outcome.cancelled_purchases, vec!["pur-1".to_string()]);
        assert_eq!(approved_sum(next, TransactionKind::Profit, "pur-1"), 0);
        assert_eq!(approved_sum(next, TransactionKind::Commission, "pur-1"), 0);
        assert_eq!(
            next.transaction(&recharge_id).expect("recharge").status,
            TransactionStatus::Rejected
        );

        assert_eq!(next.logs.len(), 1);
        assert_eq!(next.logs[0].action, "FRAUD_REVERSAL");
        assert_eq!(next.logs[0].actor_id, "admin-1");
    }

    #[test]
    fn test_preview_matches_commit() {
        let (ledger, recharge_id) = fixture(5000, 500);
        let preview = compute_impact(&ledger, &recharge_id).expect("impact");
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");

        let decrease: Amount = ledger
            .users
            .iter()
            .map(|before| {
                let after = outcome.snapshot.user(&before.id).expect("user");
                (before.balance - after.balance)
                    + (before.withdrawable_balance - after.withdrawable_balance)
            })
            .sum();
        assert_eq!(preview.total_deduction, decrease);
        assert_eq!(preview, outcome.impact);
    }

    #[test]
    fn test_negative_balance_freezes() {
        // balance 100 + withdrawable 50 cannot absorb 1000 + 20.
        let (ledger, recharge_id) = fixture(100, 50);
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");
        let user = outcome.snapshot.user("usr-1").expect("user");
        assert_eq!(user.status, UserStatus::Frozen);
        assert_eq!(user.balance, -900, "negative balances are not clamped");
        assert_eq!(user.withdrawable_balance, 30);
        assert_eq!(outcome.frozen_users, vec!["usr-1".to_string()]);
    }

    #[test]
    fn test_upline_overdrawn_is_frozen() {
        let (mut ledger, recharge_id) = fixture(5000, 500);
        ledger.user_mut("usr-up").expect("up").withdrawable_balance = 0;
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");
        let up = outcome.snapshot.user("usr-up").expect("up");
        assert_eq!(up.withdrawable_balance, -250);
        assert_eq!(up.status, UserStatus::Frozen);
    }

    #[test]
    fn test_banned_user_stays_banned() {
        let (mut ledger, recharge_id) = fixture(0, 0);
        ledger.user_mut("usr-1").expect("user").status = UserStatus::Banned;
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");
        assert_eq!(
            outcome.snapshot.user("usr-1").expect("user").status,
            UserStatus::Banned
        );
    }

    #[test]
    fn test_second_reversal_refused() {
        let (ledger, recharge_id) = fixture(5000, 500);
        let outcome = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect("reverse");
        let err = apply_reversal(&outcome.snapshot, &recharge_id, "admin-1", 100)
            .expect_err("already rejected");
        assert!(matches!(err, ReversalError::NotApproved { .. }));
    }

    #[test]
    fn test_failure_leaves_input_untouched() {
        let (mut ledger, recharge_id) = fixture(5000, 500);
        // Commission owner vanished: the commit must fail as a whole.
        ledger.users.retain(|u| u.id != "usr-up");
        let before = ledger.clone();
        let err = apply_reversal(&ledger, &recharge_id, "admin-1", 99).expect_err("missing upline");
        assert!(matches!(err, ReversalError::UserNotFound(_)));
        assert_eq!(ledger, before);
    }
}
