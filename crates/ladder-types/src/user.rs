//! Users and their wallets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, Timestamp, TypeError};

/// Account standing. Only `Active` users earn accrual grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    /// Held pending manual review (set automatically by fraud reversal).
    Frozen,
    Banned,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Banned => "banned",
        }
    }
}

impl FromStr for UserStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "frozen" => Ok(Self::Frozen),
            "banned" => Ok(Self::Banned),
            other => Err(TypeError::UnknownVariant {
                kind: "user status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform user with two separate balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Principal: deposited funds, spendable on plans.
    pub balance: Amount,
    /// Earnings from profit and commission, eligible for cash-out.
    pub withdrawable_balance: Amount,
    /// Lifetime total spent on plans.
    pub total_invested: Amount,
    /// Lifetime total paid out through approved withdrawals.
    pub total_withdrawn: Amount,
    /// Unique code other users quote as their sponsor.
    pub referral_code: String,
    /// Sponsor's referral code; `None` for root users.
    pub referred_by: Option<String>,
    pub status: UserStatus,
    pub created_at: Timestamp,
}

impl User {
    /// Create an active user with empty balances.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        referral_code: impl Into<String>,
        referred_by: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance: 0,
            withdrawable_balance: 0,
            total_invested: 0,
            total_withdrawn: 0,
            referral_code: referral_code.into(),
            referred_by,
            status: UserStatus::Active,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Whether either balance is below zero.
    pub fn has_negative_balance(&self) -> bool {
        self.balance < 0 || self.withdrawable_balance < 0
    }
}
