//! Yield plan purchases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, Timestamp, TypeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Active,
    /// Ran its full term. Terminal for accrual.
    Completed,
    /// Voided by a fraud reversal.
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PurchaseStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(TypeError::UnknownVariant {
                kind: "purchase status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user leasing one yield plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub plan_name: String,
    pub price: Amount,
    /// Paid to the owner once per accrual cycle.
    pub daily_income: Amount,
    pub days_remaining: u32,
    pub total_days: u32,
    pub status: PurchaseStatus,
    /// The recharge whose funds paid for this purchase, when identifiable.
    pub funded_by_txn_id: Option<String>,
    pub created_at: Timestamp,
}

impl Purchase {
    /// Whether the next accrual cycle should pay this purchase.
    pub fn is_accruing(&self) -> bool {
        self.status == PurchaseStatus::Active && self.days_remaining > 0
    }

    /// Consume one day of the plan, completing it on the last day.
    pub fn age_one_day(&mut self) {
        self.days_remaining = self.days_remaining.saturating_sub(1);
        if self.days_remaining == 0 {
            self.status = PurchaseStatus::Completed;
        }
    }
}
