//! # ladder-wallet
//!
//! Deposits and cash-outs.
//!
//! Users request recharges (deposits into principal) and withdrawals (out of
//! earnings); an admin approves or rejects each request. Only an approved
//! recharge credits the balance, and only an approved recharge can later be
//! reversed for fraud.
//!
//! ## Modules
//!
//! - [`account`]: Registration and account status
//! - [`recharge`]: Deposit requests and approval
//! - [`withdraw`]: Withdrawal requests, approval and rejection

pub mod account;
pub mod recharge;
pub mod withdraw;

use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{Transaction, TransactionKind, TransactionStatus};
use ladder_types::Amount;

/// Error types for wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// The transaction was already approved or rejected.
    #[error("transaction {id} is {status}, expected pending")]
    NotPending {
        /// Transaction id.
        id: String,
        /// Its current status.
        status: String,
    },

    /// The transaction has a different type than the operation expects.
    #[error("transaction {id} is a {actual} entry, expected {expected}")]
    WrongKind {
        /// Transaction id.
        id: String,
        /// Type the operation needs.
        expected: &'static str,
        /// Type found.
        actual: String,
    },

    /// Amount is zero or negative.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Amount),

    /// Withdrawable balance does not cover the request.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Current withdrawable balance.
        available: Amount,
        /// Requested amount.
        required: Amount,
    },

    /// The user is frozen or banned.
    #[error("user {0} is not active")]
    UserNotActive(String),

    /// Amount below the configured minimum withdrawal.
    #[error("amount {amount} is below minimum {minimum}")]
    BelowMinimumWithdrawal {
        /// The amount provided.
        amount: Amount,
        /// The minimum required amount.
        minimum: Amount,
    },

    /// No user owns this referral code.
    #[error("unknown referral code: {0}")]
    UnknownReferralCode(String),

    /// Display name is empty.
    #[error("name must not be empty")]
    InvalidName,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in wallet operation")]
    Overflow,
}

/// Convenience result type for wallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Find a pending transaction of `kind`.
pub(crate) fn pending_of_kind<'a>(
    ledger: &'a LedgerSnapshot,
    txn_id: &str,
    kind: TransactionKind,
) -> Result<&'a Transaction> {
    let txn = ledger
        .transaction(txn_id)
        .ok_or_else(|| WalletError::TransactionNotFound(txn_id.to_string()))?;
    if txn.kind != kind {
        return Err(WalletError::WrongKind {
            id: txn.id.clone(),
            expected: kind.as_str(),
            actual: txn.kind.to_string(),
        });
    }
    if txn.status != TransactionStatus::Pending {
        return Err(WalletError::NotPending {
            id: txn.id.clone(),
            status: txn.status.to_string(),
        });
    }
    Ok(txn)
}
