//! Reversal tracing and impact preview.
//!
//! [`trace`] walks the causal tags once and records every entry a reversal
//! would touch. [`compute_impact`] summarizes that trace for an operator;
//! [`crate::apply::apply_reversal`] commits exactly the same trace, so the
//! preview and the commit cannot disagree.

use ladder_types::purchase::PurchaseStatus;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{TransactionKind, TransactionStatus};
use ladder_types::Amount;
use serde::{Deserialize, Serialize};

use crate::{Result, ReversalError};

/// Blast radius of reversing one recharge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalImpact {
    pub recharge_amount: Amount,
    /// Active purchases funded by the recharge.
    pub purchases_count: usize,
    /// Approved profit paid out by those purchases.
    pub profits_total: Amount,
    /// Approved commissions those purchases generated.
    pub commissions_total: Amount,
    /// `recharge_amount + profits_total + commissions_total`.
    pub total_deduction: Amount,
}

/// One purchase to cancel and the earnings to claw back from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseClawback {
    pub purchase_id: String,
    pub owner_id: String,
    /// Ids of approved profit entries owned by the purchase owner.
    pub profit_txn_ids: Vec<String>,
    /// Ids of approved commission entries, any owner.
    pub commission_txn_ids: Vec<String>,
}

/// Everything a reversal of `recharge_txn_id` touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReversalPlan {
    pub recharge_txn_id: String,
    pub user_id: String,
    pub purchases: Vec<PurchaseClawback>,
    pub impact: ReversalImpact,
}

impl ReversalPlan {
    pub fn commissions_count(&self) -> usize {
        self.purchases.iter().map(|p| p.commission_txn_ids.len()).sum()
    }

    pub fn profits_count(&self) -> usize {
        self.purchases.iter().map(|p| p.profit_txn_ids.len()).sum()
    }
}

/// Trace the reversal of `recharge_txn_id` without changing anything.
///
/// # Errors
///
/// - [`ReversalError::NotFound`] if the id does not resolve
/// - [`ReversalError::NotRecharge`] if it is not a recharge
/// - [`ReversalError::NotApproved`] if the recharge is not approved
/// - [`ReversalError::Overflow`] on arithmetic overflow
pub fn trace(snapshot: &LedgerSnapshot, recharge_txn_id: &str) -> Result<ReversalPlan> {
    let recharge = snapshot
        .transaction(recharge_txn_id)
        .ok_or_else(|| ReversalError::NotFound(recharge_txn_id.to_string()))?;
    if recharge.kind != TransactionKind::Recharge {
        return Err(ReversalError::NotRecharge {
            id: recharge.id.clone(),
            kind: recharge.kind.to_string(),
        });
    }
    if recharge.status != TransactionStatus::Approved {
        return Err(ReversalError::NotApproved {
            id: recharge.id.clone(),
            status: recharge.status.to_string(),
        });
    }

    let mut impact = ReversalImpact {
        recharge_amount: recharge.amount,
        ..ReversalImpact::default()
    };
    let mut purchases = Vec::new();

    for purchase in snapshot.purchases.iter().filter(|p| {
        p.status == PurchaseStatus::Active
            && p.funded_by_txn_id.as_deref() == Some(recharge_txn_id)
    }) {
        let mut clawback = PurchaseClawback {
            purchase_id: purchase.id.clone(),
            owner_id: purchase.user_id.clone(),
            profit_txn_ids: Vec::new(),
            commission_txn_ids: Vec::new(),
        };

        for txn in &snapshot.transactions {
            if txn.is_approved_earning_of(TransactionKind::Profit, &purchase.id)
                && txn.user_id == purchase.user_id
            {
                impact.profits_total = impact
                    .profits_total
                    .checked_add(txn.amount)
                    .ok_or(ReversalError::Overflow)?;
                clawback.profit_txn_ids.push(txn.id.clone());
            } else if txn.is_approved_earning_of(TransactionKind::Commission, &purchase.id) {
                impact.commissions_total = impact
                    .commissions_total
                    .checked_add(txn.amount)
                    .ok_or(ReversalError::Overflow)?;
                clawback.commission_txn_ids.push(txn.id.clone());
            }
        }

        purchases.push(clawback);
    }

    impact.purchases_count = purchases.len();
    impact.total_deduction = impact
        .recharge_amount
        .checked_add(impact.profits_total)
        .and_then(|v| v.checked_add(impact.commissions_total))
        .ok_or(ReversalError::Overflow)?;

    Ok(ReversalPlan {
        recharge_txn_id: recharge.id.clone(),
        user_id: recharge.user_id.clone(),
        purchases,
        impact,
    })
}

/// Preview the deduction a reversal of `recharge_txn_id` would apply.
///
/// # Errors
///
/// Same as [`trace`].
pub fn compute_impact(snapshot: &LedgerSnapshot, recharge_txn_id: &str) -> Result<ReversalImpact> {
    trace(snapshot, recharge_txn_id).map(|plan| plan.impact)
}
