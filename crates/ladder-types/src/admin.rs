//! Admin configuration record.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Default level-1 commission percentage.
pub const DEFAULT_COMMISSION_L1: u8 = 25;

/// Default level-2 commission percentage.
pub const DEFAULT_COMMISSION_L2: u8 = 3;

/// Default level-3 commission percentage.
pub const DEFAULT_COMMISSION_L3: u8 = 2;

/// Default local time of day for the automatic accrual run.
pub const DEFAULT_AUTOMATIC_INCOME_TIME: &str = "00:00";

/// Single admin-controlled configuration row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Manual circuit breaker: while set, accrual cycles are no-ops.
    #[serde(default)]
    pub income_frozen: bool,
    #[serde(default = "default_true")]
    pub automatic_income_enabled: bool,
    /// `"HH:MM"` in the operating timezone.
    #[serde(default = "default_income_time")]
    pub automatic_income_time: String,
    /// RFC 3339 stamp of the last accrual run, in the operating timezone.
    #[serde(default)]
    pub last_income_run: Option<String>,
    /// Level-1 commission, percent of purchase price.
    #[serde(default = "default_l1")]
    pub commission_l1: u8,
    #[serde(default = "default_l2")]
    pub commission_l2: u8,
    #[serde(default = "default_l3")]
    pub commission_l3: u8,
    /// Smallest withdrawal a user may request.
    #[serde(default)]
    pub min_withdrawal: Amount,
}

fn default_true() -> bool {
    true
}

fn default_income_time() -> String {
    DEFAULT_AUTOMATIC_INCOME_TIME.to_string()
}

fn default_l1() -> u8 {
    DEFAULT_COMMISSION_L1
}

fn default_l2() -> u8 {
    DEFAULT_COMMISSION_L2
}

fn default_l3() -> u8 {
    DEFAULT_COMMISSION_L3
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            income_frozen: false,
            automatic_income_enabled: true,
            automatic_income_time: default_income_time(),
            last_income_run: None,
            commission_l1: DEFAULT_COMMISSION_L1,
            commission_l2: DEFAULT_COMMISSION_L2,
            commission_l3: DEFAULT_COMMISSION_L3,
            min_withdrawal: 0,
        }
    }
}

impl AdminConfig {
    /// Commission percentages ordered by referral tier.
    pub fn commission_rates(&self) -> [u8; 3] {
        [self.commission_l1, self.commission_l2, self.commission_l3]
    }
}
