//! Deposit requests and approval.

use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{Transaction, TransactionKind, TransactionStatus};
use ladder_types::{Amount, Timestamp};

use crate::{pending_of_kind, Result, WalletError};

/// Record a pending deposit for `user_id`.
///
/// # Errors
///
/// - [`WalletError::InvalidAmount`] if `amount` is not positive
/// - [`WalletError::UserNotFound`] / [`WalletError::UserNotActive`]
pub fn request_recharge(
    snapshot: &LedgerSnapshot,
    user_id: &str,
    amount: Amount,
    now: Timestamp,
) -> Result<(LedgerSnapshot, Transaction)> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount(amount));
    }
    let user = snapshot
        .user(user_id)
        .ok_or_else(|| WalletError::UserNotFound(user_id.to_string()))?;
    if !user.is_active() {
        return Err(WalletError::UserNotActive(user.id.clone()));
    }

    let txn = Transaction::recharge_request(user_id, amount, now);
    let mut next = snapshot.clone();
    next.transactions.push(txn.clone());

    tracing::info!(user = user_id, amount, txn = %txn.id, "recharge requested");
    Ok((next, txn))
}

/// Approve a pending deposit and credit the principal balance.
///
/// # Errors
///
/// - [`WalletError::TransactionNotFound`], [`WalletError::WrongKind`],
///   [`WalletError::NotPending`] if the id is not a pending recharge
/// - [`WalletError::UserNotFound`] if its owner is missing
/// - [`WalletError::Overflow`] on arithmetic overflow
pub fn approve_recharge(
    snapshot: &LedgerSnapshot,
    txn_id: &str,
    actor: &str,
    now: Timestamp,
) -> Result<LedgerSnapshot> {
    let txn = pending_of_kind(snapshot, txn_id, TransactionKind::Recharge)?;
    let (user_id, amount) = (txn.user_id.clone(), txn.amount);

    let mut next = snapshot.clone();
    let user = next
        .user_mut(&user_id)
        .ok_or_else(|| WalletError::UserNotFound(user_id.clone()))?;
    user.balance = user.balance.checked_add(amount).ok_or(WalletError::Overflow)?;

    if let Some(txn) = next.transaction_mut(txn_id) {
        txn.status = TransactionStatus::Approved;
    }
    next.push_log(AuditEntry::new(
        "RECHARGE_APPROVED",
        format!("Approved recharge {txn_id} of {amount} for user {user_id}"),
        actor,
        now,
    ));

    tracing::info!(user = %user_id, amount, txn = txn_id, actor, "recharge approved");
    Ok(next)
}
