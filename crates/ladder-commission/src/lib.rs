//! # ladder-commission
//!
//! Plan purchases and the multi-level referral commission cascade.
//!
//! Buying a plan debits the purchaser's principal and pays up to three
//! upline sponsors a percentage of the price. Both happen on one working
//! copy of the ledger so the debit is never visible without the credits.
//!
//! ## Modules
//!
//! - [`cascade`]: Referral chain walk and commission credits
//! - [`purchase`]: Plan purchase with funding attribution

pub mod cascade;
pub mod purchase;

use ladder_types::Amount;

/// Error types for purchase and commission operations.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    /// The referenced user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// The purchaser is frozen or banned.
    #[error("user {0} is not active")]
    UserNotActive(String),

    /// Principal balance does not cover the plan price.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Current principal balance.
        available: Amount,
        /// Plan price.
        required: Amount,
    },

    /// The plan terms are unusable.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A commission percentage is out of range.
    #[error("commission rate for level {level} is {rate}%, must be at most 100")]
    InvalidRate {
        /// Referral tier (1-3).
        level: u8,
        /// The configured percentage.
        rate: u8,
    },

    /// The explicitly named funding recharge cannot fund this purchase.
    #[error("invalid funding transaction: {0}")]
    InvalidFunding(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in commission calculation")]
    Overflow,
}

/// Convenience result type for commission operations.
pub type Result<T> = std::result::Result<T, CommissionError>;
