//! # ladder-reversal
//!
//! Fraud nullification of an approved deposit.
//!
//! Reversing a recharge undoes the deposit itself and everything that can be
//! traced back to it through the ledger's causal tags:
//!
//! ```text
//! recharge T
//!   └─ purchases with funded_by_txn_id = T (still active)
//!        ├─ profit entries with source_purchase_id = purchase   (owner)
//!        └─ commission entries with source_purchase_id = purchase (uplines)
//! ```
//!
//! ## Modules
//!
//! - [`plan`]: Read-only trace of what a reversal touches, and its preview
//! - [`apply`]: The mutating commit

pub mod apply;
pub mod plan;

/// Error types for reversal operations.
#[derive(Debug, thiserror::Error)]
pub enum ReversalError {
    /// The transaction id does not resolve.
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// The transaction exists but is not a deposit.
    #[error("transaction {id} is a {kind} entry, not a recharge")]
    NotRecharge {
        /// The offending transaction id.
        id: String,
        /// Its actual type.
        kind: String,
    },

    /// Only an approved deposit can be reversed.
    #[error("recharge {id} is {status}, only approved recharges can be reversed")]
    NotApproved {
        /// The recharge id.
        id: String,
        /// Its current status.
        status: String,
    },

    /// A traced entry refers to a user that does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in reversal")]
    Overflow,
}

/// Convenience result type for reversal operations.
pub type Result<T> = std::result::Result<T, ReversalError>;
