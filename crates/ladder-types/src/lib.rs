//! # ladder-types
//!
//! Shared domain types for the referral ledger.
//!
//! Every engine crate in the workspace operates on a [`snapshot::LedgerSnapshot`]:
//! it receives an immutable snapshot, computes a new one, and hands it back to
//! the caller for persistence.
//!
//! ## Modules
//!
//! - [`user`]: Users, wallets and referral pointers
//! - [`purchase`]: Yield plan purchases
//! - [`transaction`]: Ledger entries and their causal tags
//! - [`audit`]: Capped audit log
//! - [`admin`]: Admin configuration record
//! - [`snapshot`]: The whole-ledger snapshot and lookup helpers

pub mod admin;
pub mod audit;
pub mod purchase;
pub mod snapshot;
pub mod transaction;
pub mod user;

/// Monetary amount in minor currency units (cents).
///
/// Signed: a reversal may leave a balance negative until an operator
/// reviews the frozen account.
pub type Amount = i64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Maximum number of audit entries retained.
pub const AUDIT_LOG_CAP: usize = 100;

/// Number of referral tiers paid by the commission cascade.
pub const COMMISSION_LEVELS: usize = 3;

/// Actor id used for operations the daemon performs on its own.
pub const SYSTEM_ACTOR: &str = "system";

/// Error types for parsing stored domain values.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A stored enum tag is not recognized.
    #[error("unknown {kind} value: {value}")]
    UnknownVariant {
        /// The enum being parsed.
        kind: &'static str,
        /// The offending text.
        value: String,
    },
}

/// Convenience result type for domain type parsing.
pub type Result<T> = std::result::Result<T, TypeError>;

/// Generate a fresh identifier with a short type prefix, e.g. `txn-3f2a...`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_prefix_and_uniqueness() {
        let a = new_id("txn");
        let b = new_id("txn");
        assert!(a.starts_with("txn-"));
        assert_eq!(a.len(), "txn-".len() + 32);
        assert_ne!(a, b);
    }
}
