//! Integration test crate for the referral ledger.
//!
//! The tests under `tests/` exercise end-to-end flows across the engine
//! crates and the store. This library only holds the fixtures they share:
//! small wrappers that drive a [`LedgerSnapshot`] through the public
//! operations the way the daemon does.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p ladder-integration-tests
//! ```

use ladder_commission::purchase::{purchase_plan, PlanSpec, PurchaseReceipt, PurchaseRequest};
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::transaction::{TransactionKind, TransactionStatus};
use ladder_types::{Amount, Timestamp};

/// Acting admin id used by fixtures.
pub const ADMIN: &str = "admin-1";

/// Register a user and return its id. `sponsor` is a user id, not a code.
pub fn register(ledger: &mut LedgerSnapshot, name: &str, sponsor: Option<&str>) -> String {
    let code = sponsor.map(|id| {
        ledger
            .user(id)
            .expect("sponsor exists")
            .referral_code
            .clone()
    });
    let (next, user) = ladder_wallet::account::register_user(ledger, name, code.as_deref(), 0)
        .expect("register user");
    *ledger = next;
    user.id
}

/// File and approve a recharge; returns the recharge id.
pub fn fund(ledger: &mut LedgerSnapshot, user_id: &str, amount: Amount, now: Timestamp) -> String {
    let (pending, txn) = ladder_wallet::recharge::request_recharge(ledger, user_id, amount, now)
        .expect("request recharge");
    *ledger = ladder_wallet::recharge::approve_recharge(&pending, &txn.id, ADMIN, now)
        .expect("approve recharge");
    txn.id
}

/// Plan terms.
pub fn plan(price: Amount, daily_income: Amount, total_days: u32) -> PlanSpec {
    PlanSpec {
        name: format!("Plan {price}"),
        price,
        daily_income,
        total_days,
    }
}

/// Buy `terms` for `user_id`, attributing funding automatically.
pub fn buy(
    ledger: &mut LedgerSnapshot,
    user_id: &str,
    terms: PlanSpec,
    now: Timestamp,
) -> PurchaseReceipt {
    let request = PurchaseRequest {
        user_id: user_id.to_string(),
        plan: terms,
        funded_by_txn_id: None,
    };
    let receipt = purchase_plan(ledger, &request, now).expect("purchase plan");
    *ledger = receipt.snapshot.clone();
    receipt
}

/// Sum of approved entries of `kind` generated by `purchase_id`.
pub fn approved_total(ledger: &LedgerSnapshot, kind: TransactionKind, purchase_id: &str) -> Amount {
    ledger
        .transactions
        .iter()
        .filter(|t| t.kind == kind && t.status == TransactionStatus::Approved)
        .filter(|t| t.source_purchase_id.as_deref() == Some(purchase_id))
        .map(|t| t.amount)
        .sum()
}
