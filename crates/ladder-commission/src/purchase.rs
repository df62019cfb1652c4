//! Plan purchase.
//!
//! A purchase is one logical unit: principal debit, purchase record,
//! `purchase` ledger entry and the commission cascade are applied to a
//! clone of the snapshot, and the clone is returned only if every step
//! succeeded.
//!
//! ## Funding attribution
//!
//! The purchase records which approved recharge paid for it so that a later
//! fraud reversal of that recharge can find it. An explicit recharge id is
//! validated; otherwise the newest approved recharge of the purchaser with
//! enough unattributed funds left is chosen. When no single recharge covers
//! the price the funding source is left empty.

use ladder_types::purchase::{Purchase, PurchaseStatus};
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{Transaction, TransactionKind};
use ladder_types::{new_id, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::cascade::{distribute_commissions, CommissionRates};
use crate::{CommissionError, Result};

/// Terms of a yield plan as offered for sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSpec {
    pub name: String,
    pub price: Amount,
    pub daily_income: Amount,
    pub total_days: u32,
}

impl PlanSpec {
    fn validate(&self) -> Result<()> {
        if self.price <= 0 {
            return Err(CommissionError::InvalidPlan(
                "price must be positive".to_string(),
            ));
        }
        if self.daily_income < 0 {
            return Err(CommissionError::InvalidPlan(
                "daily income must be non-negative".to_string(),
            ));
        }
        if self.total_days == 0 {
            return Err(CommissionError::InvalidPlan(
                "plan must run for at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: String,
    pub plan: PlanSpec,
    /// Recharge that paid for the plan. Inferred when absent.
    #[serde(default)]
    pub funded_by_txn_id: Option<String>,
}

/// Result of a successful purchase.
#[derive(Clone, Debug)]
pub struct PurchaseReceipt {
    /// The ledger after the purchase; persist this.
    pub snapshot: LedgerSnapshot,
    pub purchase: Purchase,
    pub commissions: Vec<Transaction>,
}

/// Buy a plan for `request.user_id`.
///
/// # Errors
///
/// - [`CommissionError::UserNotFound`] if the purchaser does not exist
/// - [`CommissionError::UserNotActive`] if the purchaser is frozen or banned
/// - [`CommissionError::InvalidPlan`] if the plan terms are unusable
/// - [`CommissionError::InsufficientBalance`] if principal does not cover the price
/// - [`CommissionError::InvalidFunding`] if the named recharge cannot fund it
/// - [`CommissionError::InvalidRate`] / [`CommissionError::Overflow`] from the cascade
pub fn purchase_plan(
    snapshot: &LedgerSnapshot,
    request: &PurchaseRequest,
    now: Timestamp,
) -> Result<PurchaseReceipt> {
    request.plan.validate()?;

    let purchaser = snapshot
        .user(&request.user_id)
        .ok_or_else(|| CommissionError::UserNotFound(request.user_id.clone()))?
        .clone();
    if !purchaser.is_active() {
        return Err(CommissionError::UserNotActive(purchaser.id));
    }
    if purchaser.balance < request.plan.price {
        return Err(CommissionError::InsufficientBalance {
            available: purchaser.balance,
            required: request.plan.price,
        });
    }

    let funded_by_txn_id = match &request.funded_by_txn_id {
        Some(txn_id) => {
            check_funding(snapshot, &purchaser.id, txn_id)?;
            Some(txn_id.clone())
        }
        None => attribute_funding(snapshot, &purchaser.id, request.plan.price),
    };

    let mut next = snapshot.clone();

    let purchase = Purchase {
        id: new_id("pur"),
        user_id: purchaser.id.clone(),
        plan_name: request.plan.name.clone(),
        price: request.plan.price,
        daily_income: request.plan.daily_income,
        days_remaining: request.plan.total_days,
        total_days: request.plan.total_days,
        status: PurchaseStatus::Active,
        funded_by_txn_id,
        created_at: now,
    };

    {
        let owner = next
            .user_mut(&purchaser.id)
            .ok_or_else(|| CommissionError::UserNotFound(purchaser.id.clone()))?;
        owner.balance -= purchase.price;
        owner.total_invested = owner
            .total_invested
            .checked_add(purchase.price)
            .ok_or(CommissionError::Overflow)?;
    }

    next.transactions.push(Transaction::purchase_debit(
        &purchaser.id,
        &purchase.id,
        &purchase.plan_name,
        purchase.price,
        now,
    ));
    next.purchases.push(purchase.clone());

    let rates = CommissionRates::from_admin(&next.admin);
    let commissions = distribute_commissions(&mut next, &purchase, &purchaser, &rates, now)?;

    tracing::info!(
        user = %purchaser.id,
        purchase = %purchase.id,
        price = purchase.price,
        funded_by = ?purchase.funded_by_txn_id,
        commissions = commissions.len(),
        "plan purchased"
    );

    Ok(PurchaseReceipt {
        snapshot: next,
        purchase,
        commissions,
    })
}

fn check_funding(snapshot: &LedgerSnapshot, user_id: &str, txn_id: &str) -> Result<()> {
    let txn = snapshot
        .transaction(txn_id)
        .ok_or_else(|| CommissionError::InvalidFunding(format!("{txn_id} not found")))?;
    if txn.kind != TransactionKind::Recharge {
        return Err(CommissionError::InvalidFunding(format!(
            "{txn_id} is a {} entry, not a recharge",
            txn.kind
        )));
    }
    if !txn.is_approved() {
        return Err(CommissionError::InvalidFunding(format!(
            "{txn_id} is {}, not approved",
            txn.status
        )));
    }
    if txn.user_id != user_id {
        return Err(CommissionError::InvalidFunding(format!(
            "{txn_id} belongs to another user"
        )));
    }
    Ok(())
}

/// Pick the newest approved recharge of `user_id` that still has `price`
/// left after the purchases already attributed to it.
pub fn attribute_funding(
    snapshot: &LedgerSnapshot,
    user_id: &str,
    price: Amount,
) -> Option<String> {
    snapshot
        .transactions
        .iter()
        .rev()
        .filter(|t| t.user_id == user_id && t.kind == TransactionKind::Recharge && t.is_approved())
        .find(|recharge| {
            let consumed: Amount = snapshot
                .purchases
                .iter()
                .filter(|p| {
                    p.status != PurchaseStatus::Cancelled
                        && p.funded_by_txn_id.as_deref() == Some(recharge.id.as_str())
                })
                .map(|p| p.price)
                .sum();
            recharge.amount - consumed >= price
        })
        .map(|recharge| recharge.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_types::transaction::TransactionStatus;
    use ladder_types::user::{User, UserStatus};

    fn approved_recharge(user_id: &str, amount: Amount) -> Transaction {
        let mut txn = Transaction::recharge_request(user_id, amount, 0);
        txn.status = TransactionStatus::Approved;
        txn
    }

    fn ledger_with_deposit(amount: Amount) -> (LedgerSnapshot, String) {
        let mut ledger = LedgerSnapshot::default();
        ledger.users.push(User::new("usr-s", "Sponsor", "SPON", None, 0));
        let mut buyer = User::new("usr-b", "Buyer", "BUY", Some("SPON".into()), 0);
        buyer.balance = amount;
        ledger.users.push(buyer);
        let recharge = approved_recharge("usr-b", amount);
        let id = recharge.id.clone();
        ledger.transactions.push(recharge);
        (ledger, id)
    }

    fn request(price: Amount) -> PurchaseRequest {
        PurchaseRequest {
            user_id: "usr-b".into(),
            plan: PlanSpec {
                name: "Silver".into(),
                price,
                daily_income: 10,
                total_days: 3,
            },
            funded_by_txn_id: None,
        }
    }

    #[test]
    fn test_purchase_debits_and_cascades() {
        let (ledger, recharge_id) = ledger_with_deposit(1000);
        let receipt = purchase_plan(&ledger, &request(400), 50).expect("purchase");

        let buyer = receipt.snapshot.user("usr-b").expect("buyer");
        assert_eq!(buyer.balance, 600);
        assert_eq!(buyer.total_invested, 400);
        assert_eq!(receipt.purchase.funded_by_txn_id.as_deref(), Some(recharge_id.as_str()));
        assert_eq!(receipt.purchase.days_remaining, 3);

        assert_eq!(receipt.commissions.len(), 1);
        let sponsor = receipt.snapshot.user("usr-s").expect("sponsor");
        assert_eq!(sponsor.withdrawable_balance, 100);

        let debit = receipt
            .snapshot
            .transactions
            .iter()
            .find(|t| t.kind == TransactionKind::Purchase)
            .expect("purchase entry");
        assert_eq!(debit.source_purchase_id.as_deref(), Some(receipt.purchase.id.as_str()));

        // The input snapshot is untouched.
        assert_eq!(ledger.user("usr-b").expect("buyer").balance, 1000);
        assert!(ledger.purchases.is_empty());
    }

    #[test]
    fn test_insufficient_balance() {
        let (ledger, _) = ledger_with_deposit(100);
        let err = purchase_plan(&ledger, &request(400), 0).expect_err("too expensive");
        assert!(matches!(
            err,
            CommissionError::InsufficientBalance {
                available: 100,
                required: 400
            }
        ));
    }

    #[test]
    fn test_frozen_user_cannot_buy() {
        let (mut ledger, _) = ledger_with_deposit(1000);
        ledger.user_mut("usr-b").expect("buyer").status = UserStatus::Frozen;
        let err = purchase_plan(&ledger, &request(400), 0).expect_err("frozen");
        assert!(matches!(err, CommissionError::UserNotActive(_)));
    }

    #[test]
    fn test_invalid_plan_rejected() {
        let (ledger, _) = ledger_with_deposit(1000);
        let mut req = request(400);
        req.plan.total_days = 0;
        assert!(matches!(
            purchase_plan(&ledger, &req, 0),
            Err(CommissionError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_attribution_skips_consumed_recharge() {
        let (ledger, first) = ledger_with_deposit(500);
        let receipt = purchase_plan(&ledger, &request(400), 0).expect("first purchase");
        assert_eq!(receipt.purchase.funded_by_txn_id.as_deref(), Some(first.as_str()));

        // 100 left on the first recharge: a second 400 plan has no single source.
        let mut ledger = receipt.snapshot;
        ledger.user_mut("usr-b").expect("buyer").balance = 500;
        let receipt = purchase_plan(&ledger, &request(400), 0).expect("second purchase");
        assert!(receipt.purchase.funded_by_txn_id.is_none());
    }

    #[test]
    fn test_explicit_funding_must_be_own_approved_recharge() {
        let (mut ledger, recharge_id) = ledger_with_deposit(1000);
        let mut req = request(400);

        req.funded_by_txn_id = Some("txn-missing".into());
        assert!(matches!(
            purchase_plan(&ledger, &req, 0),
            Err(CommissionError::InvalidFunding(_))
        ));

        ledger
            .transaction_mut(&recharge_id)
            .expect("recharge")
            .user_id = "usr-s".into();
        req.funded_by_txn_id = Some(recharge_id);
        assert!(matches!(
            purchase_plan(&ledger, &req, 0),
            Err(CommissionError::InvalidFunding(_))
        ));
    }
}
