//! # ladder-accrual
//!
//! Daily income distribution.
//!
//! Once per calendar day every active purchase pays its `daily_income` into
//! the owner's withdrawable balance and loses one day of its term.
//!
//! ## Modules
//!
//! - [`distribution`]: One accrual cycle over all purchases
//! - [`scheduler`]: Once-per-day gate around the cycle
//! - [`breaker`]: Admin income freeze switch
//! - [`settings`]: Commission rates, schedule and withdrawal floor

pub mod breaker;
pub mod distribution;
pub mod scheduler;
pub mod settings;

/// Error types for accrual operations.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    /// An accruing purchase points at a user that does not exist.
    #[error("purchase {purchase_id} belongs to unknown user {user_id}")]
    UserNotFound {
        /// The orphaned purchase.
        purchase_id: String,
        /// The missing owner id.
        user_id: String,
    },

    /// `automatic_income_time` is not a valid `HH:MM` value.
    #[error("invalid automatic income time {0:?}, expected HH:MM")]
    InvalidScheduleTime(String),

    /// An admin setting is out of range.
    #[error("invalid admin setting: {0}")]
    InvalidSetting(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in accrual")]
    Overflow,
}

/// Convenience result type for accrual operations.
pub type Result<T> = std::result::Result<T, AccrualError>;
