//! Withdrawals and request rejection.
//!
//! A withdrawal request holds the funds immediately by debiting the
//! withdrawable balance, so the same earnings cannot be requested twice.
//! Approval only moves the lifetime counter; rejection returns the hold.

use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{Transaction, TransactionKind, TransactionStatus};
use ladder_types::{Amount, Timestamp};

use crate::{pending_of_kind, Result, WalletError};

/// Request a cash-out of `amount` from earnings.
///
/// # Errors
///
/// - [`WalletError::InvalidAmount`] if `amount` is not positive
/// - [`WalletError::BelowMinimumWithdrawal`] if under the admin minimum
/// - [`WalletError::UserNotFound`] / [`WalletError::UserNotActive`]
/// - [`WalletError::InsufficientFunds`] if earnings do not cover it
pub fn request_withdrawal(
    snapshot: &LedgerSnapshot,
    user_id: &str,
    amount: Amount,
    now: Timestamp,
) -> Result<(LedgerSnapshot, Transaction)> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount(amount));
    }
    let minimum = snapshot.admin.min_withdrawal;
    if amount < minimum {
        return Err(WalletError::BelowMinimumWithdrawal { amount, minimum });
    }

    let mut next = snapshot.clone();
    let user = next
        .user_mut(user_id)
        .ok_or_else(|| WalletError::UserNotFound(user_id.to_string()))?;
    if !user.is_active() {
        return Err(WalletError::UserNotActive(user.id.clone()));
    }
    if user.withdrawable_balance < amount {
        return Err(WalletError::InsufficientFunds {
            available: user.withdrawable_balance,
            required: amount,
        });
    }
    user.withdrawable_balance -= amount;

    let txn = Transaction::withdraw_request(user_id, amount, now);
    next.transactions.push(txn.clone());

    tracing::info!(user = user_id, amount, txn = %txn.id, "withdrawal requested");
    Ok((next, txn))
}

/// Approve a pending withdrawal.
///
/// # Errors
///
/// - [`WalletError::TransactionNotFound`], [`WalletError::WrongKind`],
///   [`WalletError::NotPending`] if the id is not a pending withdrawal
/// - [`WalletError::UserNotFound`] if its owner is missing
/// - [`WalletError::Overflow`] on arithmetic overflow
pub fn approve_withdrawal(
    snapshot: &LedgerSnapshot,
    txn_id: &str,
    actor: &str,
    now: Timestamp,
) -> Result<LedgerSnapshot> {
    let txn = pending_of_kind(snapshot, txn_id, TransactionKind::Withdraw)?;
    let (user_id, amount) = (txn.user_id.clone(), txn.amount);

    let mut next = snapshot.clone();
    let user = next
        .user_mut(&user_id)
        .ok_or_else(|| WalletError::UserNotFound(user_id.clone()))?;
    user.total_withdrawn = user
        .total_withdrawn
        .checked_add(amount)
        .ok_or(WalletError::Overflow)?;

    if let Some(txn) = next.transaction_mut(txn_id) {
        txn.status = TransactionStatus::Approved;
    }
    next.push_log(AuditEntry::new(
        "WITHDRAWAL_APPROVED",
        format!("Approved withdrawal {txn_id} of {amount} for user {user_id}"),
        actor,
        now,
    ));

    tracing::info!(user = %user_id, amount, txn = txn_id, actor, "withdrawal approved");
    Ok(next)
}

/// Reject a pending recharge or withdrawal. A rejected withdrawal returns
/// its held amount to the withdrawable balance.
///
/// # Errors
///
/// - [`WalletError::TransactionNotFound`] if the id does not resolve
/// - [`WalletError::WrongKind`] for entries that are not requests
/// - [`WalletError::NotPending`] if already decided
/// - [`WalletError::UserNotFound`] if a withdrawal's owner is missing
pub fn reject_transaction(
    snapshot: &LedgerSnapshot,
    txn_id: &str,
    actor: &str,
    reason: &str,
    now: Timestamp,
) -> Result<LedgerSnapshot> {
    let kind = snapshot
        .transaction(txn_id)
        .map(|t| t.kind)
        .ok_or_else(|| WalletError::TransactionNotFound(txn_id.to_string()))?;
    let kind = match kind {
        TransactionKind::Recharge | TransactionKind::Withdraw => kind,
        other => {
            return Err(WalletError::WrongKind {
                id: txn_id.to_string(),
                expected: "recharge or withdraw",
                actual: other.to_string(),
            })
        }
    };
    let txn = pending_of_kind(snapshot, txn_id, kind)?;
    let (user_id, amount) = (txn.user_id.clone(), txn.amount);

    let mut next = snapshot.clone();
    if kind == TransactionKind::Withdraw {
        let user = next
            .user_mut(&user_id)
            .ok_or_else(|| WalletError::UserNotFound(user_id.clone()))?;
        user.withdrawable_balance = user
            .withdrawable_balance
            .checked_add(amount)
            .ok_or(WalletError::Overflow)?;
    }
    if let Some(txn) = next.transaction_mut(txn_id) {
        txn.reject(reason);
    }

    let action = match kind {
        TransactionKind::Withdraw => "WITHDRAWAL_REJECTED",
        _ => "RECHARGE_REJECTED",
    };
    next.push_log(AuditEntry::new(
        action,
        format!("Rejected {kind} {txn_id} of {amount} for user {user_id}: {reason}"),
        actor,
        now,
    ));

    tracing::info!(user = %user_id, amount, txn = txn_id, actor, %kind, "request rejected");
    Ok(next)
}
