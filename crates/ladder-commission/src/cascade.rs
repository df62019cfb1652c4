//! Referral commission cascade.
//!
//! Starting from the purchaser's sponsor, each of up to three upline users
//! receives a fixed percentage of the purchase price into their withdrawable
//! balance:
//!
//! ```text
//! commission(level) = price * rate(level) / 100
//! ```
//!
//! The walk stops early when a referral code does not resolve. It never
//! takes more than [`COMMISSION_LEVELS`] hops, so a cyclic chain cannot loop.

use ladder_types::admin::AdminConfig;
use ladder_types::purchase::Purchase;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::Transaction;
use ladder_types::user::User;
use ladder_types::{Amount, Timestamp, COMMISSION_LEVELS};
use serde::{Deserialize, Serialize};

use crate::{CommissionError, Result};

/// Commission percentages ordered by referral tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub levels: [u8; COMMISSION_LEVELS],
}

impl CommissionRates {
    pub fn new(l1: u8, l2: u8, l3: u8) -> Self {
        Self {
            levels: [l1, l2, l3],
        }
    }

    /// Rates currently configured by the admin.
    pub fn from_admin(admin: &AdminConfig) -> Self {
        Self {
            levels: admin.commission_rates(),
        }
    }

    /// Check that every tier is a valid percentage.
    ///
    /// # Errors
    ///
    /// - [`CommissionError::InvalidRate`] if any tier exceeds 100
    pub fn validate(&self) -> Result<()> {
        for (i, &rate) in self.levels.iter().enumerate() {
            if rate > 100 {
                return Err(CommissionError::InvalidRate {
                    level: i as u8 + 1,
                    rate,
                });
            }
        }
        Ok(())
    }
}

/// Commission owed on `price` at `rate` percent, rounded down.
///
/// # Errors
///
/// - [`CommissionError::Overflow`] on arithmetic overflow
pub fn commission_amount(price: Amount, rate: u8) -> Result<Amount> {
    price
        .checked_mul(Amount::from(rate))
        .map(|v| v / 100)
        .ok_or(CommissionError::Overflow)
}

/// Walk the purchaser's referral chain and credit commissions.
///
/// Mutates `ledger` (the caller's working copy): upline withdrawable
/// balances are credited and the emitted `commission` transactions are
/// appended. The same transactions are returned.
///
/// A zero-amount commission is not recorded, but the walk still advances
/// past that tier.
///
/// # Errors
///
/// - [`CommissionError::InvalidRate`] if a rate exceeds 100
/// - [`CommissionError::Overflow`] on arithmetic overflow
///
/// On error the working copy may be partially credited and must be
/// discarded.
pub fn distribute_commissions(
    ledger: &mut LedgerSnapshot,
    purchase: &Purchase,
    purchaser: &User,
    rates: &CommissionRates,
    now: Timestamp,
) -> Result<Vec<Transaction>> {
    rates.validate()?;

    let mut emitted = Vec::with_capacity(COMMISSION_LEVELS);
    let mut pointer = purchaser.referred_by.clone();

    for (i, &rate) in rates.levels.iter().enumerate() {
        let level = i as u8 + 1;
        let Some(code) = pointer.take() else {
            break;
        };
        let Some(upline) = ledger.users.iter_mut().find(|u| u.referral_code == code) else {
            tracing::debug!(level, code = %code, "referral chain ends at unknown code");
            break;
        };

        let amount = commission_amount(purchase.price, rate)?;
        if amount > 0 {
            upline.withdrawable_balance = upline
                .withdrawable_balance
                .checked_add(amount)
                .ok_or(CommissionError::Overflow)?;

            emitted.push(Transaction::commission(
                &upline.id,
                &purchase.id,
                level,
                amount,
                format!(
                    "Level {level} commission ({rate}%) from {} buying {}",
                    purchaser.referral_code, purchase.plan_name
                ),
                now,
            ));

            tracing::debug!(
                level,
                amount,
                upline = %upline.id,
                purchase = %purchase.id,
                "commission credited"
            );
        }

        pointer = upline.referred_by.clone();
    }

    ledger.transactions.extend(emitted.iter().cloned());
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_types::purchase::PurchaseStatus;
    use ladder_types::transaction::TransactionKind;

    fn purchase(price: Amount) -> Purchase {
        Purchase {
            id: "pur-1".into(),
            user_id: "usr-d".into(),
            plan_name: "Gold".into(),
            price,
            daily_income: 10,
            days_remaining: 30,
            total_days: 30,
            status: PurchaseStatus::Active,
            funded_by_txn_id: None,
            created_at: 0,
        }
    }

    /// Chain: ROOT -> A -> B -> C -> D (D is the purchaser).
    fn chain() -> LedgerSnapshot {
        let mut ledger = LedgerSnapshot::default();
        ledger.users.push(User::new("usr-root", "Root", "ROOT", None, 0));
        ledger
            .users
            .push(User::new("usr-a", "A", "A", Some("ROOT".into()), 0));
        ledger.users.push(User::new("usr-b", "B", "B", Some("A".into()), 0));
        ledger.users.push(User::new("usr-c", "C", "C", Some("B".into()), 0));
        ledger.users.push(User::new("usr-d", "D", "D", Some("C".into()), 0));
        ledger
    }

    fn earned(ledger: &LedgerSnapshot, id: &str) -> Amount {
        ledger.user(id).expect("user").withdrawable_balance
    }

    #[test]
    fn test_three_level_cascade() {
        let mut ledger = chain();
        let purchaser = ledger.user("usr-d").expect("purchaser").clone();
        let txns = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(25, 3, 2),
            100,
        )
        .expect("cascade");

        assert_eq!(txns.len(), 3);
        assert_eq!(earned(&ledger, "usr-c"), 250);
        assert_eq!(earned(&ledger, "usr-b"), 30);
        assert_eq!(earned(&ledger, "usr-a"), 20);
        assert_eq!(earned(&ledger, "usr-root"), 0);

        for (i, txn) in txns.iter().enumerate() {
            assert_eq!(txn.kind, TransactionKind::Commission);
            assert_eq!(txn.level, Some(i as u8 + 1));
            assert_eq!(txn.source_purchase_id.as_deref(), Some("pur-1"));
        }
        assert_eq!(ledger.transactions.len(), 3);
    }

    #[test]
    fn test_short_chain_stops_early() {
        let mut ledger = LedgerSnapshot::default();
        ledger.users.push(User::new("usr-s", "S", "S", None, 0));
        ledger.users.push(User::new("usr-p", "P", "P", Some("S".into()), 0));
        let purchaser = ledger.user("usr-p").expect("purchaser").clone();

        let txns = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(25, 3, 2),
            0,
        )
        .expect("cascade");
        assert_eq!(txns.len(), 1);
        assert_eq!(earned(&ledger, "usr-s"), 250);
    }

    #[test]
    fn test_dangling_referral_code_is_not_an_error() {
        let mut ledger = LedgerSnapshot::default();
        ledger
            .users
            .push(User::new("usr-p", "P", "P", Some("GONE".into()), 0));
        let purchaser = ledger.user("usr-p").expect("purchaser").clone();

        let txns = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(25, 3, 2),
            0,
        )
        .expect("cascade");
        assert!(txns.is_empty());
    }

    #[test]
    fn test_cycle_is_bounded_to_three_hops() {
        // X and Y sponsor each other.
        let mut ledger = LedgerSnapshot::default();
        ledger.users.push(User::new("usr-x", "X", "X", Some("Y".into()), 0));
        ledger.users.push(User::new("usr-y", "Y", "Y", Some("X".into()), 0));
        ledger.users.push(User::new("usr-p", "P", "P", Some("X".into()), 0));
        let purchaser = ledger.user("usr-p").expect("purchaser").clone();

        let txns = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(10, 10, 10),
            0,
        )
        .expect("cascade");
        assert_eq!(txns.len(), 3);
        // X is paid at levels 1 and 3, Y at level 2.
        assert_eq!(earned(&ledger, "usr-x"), 200);
        assert_eq!(earned(&ledger, "usr-y"), 100);
    }

    #[test]
    fn test_zero_rate_skips_tier_but_continues() {
        let mut ledger = chain();
        let purchaser = ledger.user("usr-d").expect("purchaser").clone();
        let txns = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(25, 0, 2),
            0,
        )
        .expect("cascade");
        assert_eq!(txns.len(), 2);
        assert_eq!(earned(&ledger, "usr-b"), 0);
        assert_eq!(earned(&ledger, "usr-a"), 20);
        assert_eq!(txns[1].level, Some(3));
    }

    #[test]
    fn test_commission_rounds_down() {
        assert_eq!(commission_amount(999, 3).expect("amount"), 29);
        assert_eq!(commission_amount(0, 25).expect("amount"), 0);
        assert!(commission_amount(Amount::MAX, 2).is_err());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let mut ledger = chain();
        let purchaser = ledger.user("usr-d").expect("purchaser").clone();
        let err = distribute_commissions(
            &mut ledger,
            &purchase(1000),
            &purchaser,
            &CommissionRates::new(101, 0, 0),
            0,
        )
        .expect_err("rate > 100");
        assert!(matches!(err, CommissionError::InvalidRate { level: 1, rate: 101 }));
    }
}
