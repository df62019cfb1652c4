//! Ledger entries.
//!
//! A transaction row is never deleted. Corrections flip its status to
//! [`TransactionStatus::Rejected`] and append an explanation to `details`.
//!
//! `profit` and `commission` entries can only be built through
//! [`Transaction::profit`] and [`Transaction::commission`], both of which
//! require the id of the purchase that generated them. That tag is what lets
//! a fraud reversal find and claw back already-paid earnings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{new_id, Amount, Timestamp, TypeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Recharge,
    Withdraw,
    Purchase,
    Profit,
    Commission,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recharge => "recharge",
            Self::Withdraw => "withdraw",
            Self::Purchase => "purchase",
            Self::Profit => "profit",
            Self::Commission => "commission",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recharge" => Ok(Self::Recharge),
            "withdraw" => Ok(Self::Withdraw),
            "purchase" => Ok(Self::Purchase),
            "profit" => Ok(Self::Profit),
            "commission" => Ok(Self::Commission),
            other => Err(TypeError::UnknownVariant {
                kind: "transaction type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(TypeError::UnknownVariant {
                kind: "transaction status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ledger entry. `amount` is always positive; the direction of the
/// money movement follows from `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: TransactionStatus,
    /// Purchase that generated this entry (profit, commission, purchase).
    pub source_purchase_id: Option<String>,
    /// Referral tier (1-3) for commission entries.
    pub level: Option<u8>,
    pub details: String,
    pub created_at: Timestamp,
}

impl Transaction {
    fn base(
        user_id: &str,
        kind: TransactionKind,
        amount: Amount,
        status: TransactionStatus,
        details: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: new_id("txn"),
            user_id: user_id.to_string(),
            kind,
            amount,
            status,
            source_purchase_id: None,
            level: None,
            details,
            created_at,
        }
    }

    /// A deposit awaiting admin approval.
    pub fn recharge_request(user_id: &str, amount: Amount, created_at: Timestamp) -> Self {
        Self::base(
            user_id,
            TransactionKind::Recharge,
            amount,
            TransactionStatus::Pending,
            "Recharge request".to_string(),
            created_at,
        )
    }

    /// A cash-out awaiting admin approval.
    pub fn withdraw_request(user_id: &str, amount: Amount, created_at: Timestamp) -> Self {
        Self::base(
            user_id,
            TransactionKind::Withdraw,
            amount,
            TransactionStatus::Pending,
            "Withdrawal request".to_string(),
            created_at,
        )
    }

    /// The principal debit recorded when a plan is bought.
    pub fn purchase_debit(
        user_id: &str,
        purchase_id: &str,
        plan_name: &str,
        amount: Amount,
        created_at: Timestamp,
    ) -> Self {
        let mut txn = Self::base(
            user_id,
            TransactionKind::Purchase,
            amount,
            TransactionStatus::Approved,
            format!("Purchased plan {plan_name}"),
            created_at,
        );
        txn.source_purchase_id = Some(purchase_id.to_string());
        txn
    }

    /// One day of yield paid out by `purchase_id`.
    pub fn profit(
        user_id: &str,
        purchase_id: &str,
        amount: Amount,
        details: String,
        created_at: Timestamp,
    ) -> Self {
        let mut txn = Self::base(
            user_id,
            TransactionKind::Profit,
            amount,
            TransactionStatus::Approved,
            details,
            created_at,
        );
        txn.source_purchase_id = Some(purchase_id.to_string());
        txn
    }

    /// A referral commission of tier `level` generated by `purchase_id`.
    pub fn commission(
        user_id: &str,
        purchase_id: &str,
        level: u8,
        amount: Amount,
        details: String,
        created_at: Timestamp,
    ) -> Self {
        let mut txn = Self::base(
            user_id,
            TransactionKind::Commission,
            amount,
            TransactionStatus::Approved,
            details,
            created_at,
        );
        txn.source_purchase_id = Some(purchase_id.to_string());
        txn.level = Some(level);
        txn
    }

    pub fn is_approved(&self) -> bool {
        self.status == TransactionStatus::Approved
    }

    /// Whether this entry is an approved earning generated by `purchase_id`.
    pub fn is_approved_earning_of(&self, kind: TransactionKind, purchase_id: &str) -> bool {
        self.kind == kind
            && self.is_approved()
            && self.source_purchase_id.as_deref() == Some(purchase_id)
    }

    /// Mark rejected and append the reason to the audit annotation.
    pub fn reject(&mut self, reason: &str) {
        self.status = TransactionStatus::Rejected;
        if self.details.is_empty() {
            self.details = reason.to_string();
        } else {
            self.details = format!("{} | {reason}", self.details);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earnings_carry_source_tag() {
        let profit = Transaction::profit("usr-1", "pur-1", 10, "day 1".into(), 0);
        assert_eq!(profit.kind, TransactionKind::Profit);
        assert_eq!(profit.source_purchase_id.as_deref(), Some("pur-1"));
        assert!(profit.is_approved());

        let commission = Transaction::commission("usr-2", "pur-1", 2, 30, "L2".into(), 0);
        assert_eq!(commission.level, Some(2));
        assert!(commission.is_approved_earning_of(TransactionKind::Commission, "pur-1"));
        assert!(!commission.is_approved_earning_of(TransactionKind::Profit, "pur-1"));
        assert!(!commission.is_approved_earning_of(TransactionKind::Commission, "pur-2"));
    }

    #[test]
    fn test_requests_start_pending() {
        let txn = Transaction::recharge_request("usr-1", 500, 0);
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(txn.source_purchase_id.is_none());
    }

    #[test]
    fn test_reject_appends_reason() {
        let mut txn = Transaction::profit("usr-1", "pur-1", 10, "day 1".into(), 0);
        txn.reject("fraud reversal");
        assert_eq!(txn.status, TransactionStatus::Rejected);
        assert_eq!(txn.details, "day 1 | fraud reversal");
    }

    #[test]
    fn test_serde_uses_type_field() {
        let txn = Transaction::recharge_request("usr-1", 500, 0);
        let json = serde_json::to_value(&txn).expect("serialize");
        assert_eq!(json["type"], "recharge");
        assert_eq!(json["status"], "pending");
    }
}
