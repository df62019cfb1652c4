//! Income, admin settings, purchase, reversal and store command handlers.

use std::sync::Arc;

use chrono::Utc;
use ladder_accrual::scheduler::{AccrualTrigger, ScheduleDecision};
use ladder_accrual::settings::AdminConfigUpdate;
use ladder_commission::purchase::PurchaseRequest;
use serde_json::Value;

use super::{actor_param, mutate, read_snapshot, str_param, to_json, CommandError};
use crate::clock;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Run the accrual cycle now. Shares the once-per-day gate with the timer,
/// so a second call on the same local date pays nothing.
pub async fn run_accrual_cycle(state: &Arc<DaemonState>, params: &Value) -> Result {
    daily_accrual(
        state,
        AccrualTrigger::Forced,
        actor_param(params),
        "run_accrual_cycle",
    )
    .await
}

/// Timer entry point: run today's accrual if it is due.
pub async fn maybe_run_daily_accrual(state: &Arc<DaemonState>) -> Result {
    daily_accrual(
        state,
        AccrualTrigger::Automatic,
        ladder_types::SYSTEM_ACTOR,
        "maybe_run_daily_accrual",
    )
    .await
}

/// Operator entry point: run today's accrual now unless it already ran.
pub async fn force_daily_accrual(state: &Arc<DaemonState>, params: &Value) -> Result {
    daily_accrual(
        state,
        AccrualTrigger::Forced,
        actor_param(params),
        "force_daily_accrual",
    )
    .await
}

async fn daily_accrual(
    state: &Arc<DaemonState>,
    trigger: AccrualTrigger,
    actor: &str,
    method: &str,
) -> Result {
    let tz = state
        .config
        .schedule
        .timezone()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    let now = Utc::now();

    let result = mutate(state, method, |snap| {
        match ladder_accrual::scheduler::maybe_run_daily_accrual(snap, now, tz, trigger, actor)? {
            ScheduleDecision::Ran(outcome) => Ok((
                Some(outcome.snapshot),
                serde_json::json!({"ran": true, "stats": outcome.stats}),
            )),
            ScheduleDecision::Skipped(reason) => {
                Ok((None, serde_json::json!({"ran": false, "reason": reason})))
            }
        }
    })
    .await?;

    if result["ran"] == Value::Bool(true) {
        state.event_bus.emit(Event::now(
            "AccrualCompleted",
            serde_json::json!({"trigger": trigger, "stats": result["stats"].clone()}),
        ));
    }
    Ok(result)
}

/// Flip the income circuit breaker.
pub async fn set_income_frozen(state: &Arc<DaemonState>, params: &Value) -> Result {
    let frozen = params
        .get("frozen")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params("frozen required"))?;
    let actor = actor_param(params);
    let now = clock::unix_now();

    let result = mutate(state, "set_income_frozen", |snap| {
        let changed = snap.admin.income_frozen != frozen;
        let next = ladder_accrual::breaker::set_income_frozen(snap, frozen, actor, now);
        let result = serde_json::json!({"income_frozen": frozen, "changed": changed});
        Ok((Some(next), result))
    })
    .await?;

    if result["changed"] == Value::Bool(true) {
        let event_type = if frozen { "IncomeFrozen" } else { "IncomeResumed" };
        state
            .event_bus
            .emit(Event::now(event_type, serde_json::json!({"actor_id": actor})));
    }
    Ok(result)
}

/// Edit commission rates, the automatic income schedule or the withdrawal
/// floor. Fields left out keep their current value.
pub async fn set_admin_config(state: &Arc<DaemonState>, params: &Value) -> Result {
    let update: AdminConfigUpdate = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    if update.is_empty() {
        return Err(RpcError::invalid_params("no admin setting given"));
    }
    let actor = actor_param(params);
    let now = clock::unix_now();

    let result = mutate(state, "set_admin_config", |snap| {
        let next = ladder_accrual::settings::update_admin_config(snap, &update, actor, now)?;
        let changed = next.admin != snap.admin;
        let result = serde_json::json!({"admin": next.admin, "changed": changed});
        Ok((Some(next), result))
    })
    .await?;

    if result["changed"] == Value::Bool(true) {
        state.event_bus.emit(Event::now(
            "AdminConfigChanged",
            serde_json::json!({"actor_id": actor, "admin": result["admin"].clone()}),
        ));
    }
    Ok(result)
}

/// Buy a plan: debit, record the purchase and pay the commission cascade.
pub async fn purchase_plan(state: &Arc<DaemonState>, params: &Value) -> Result {
    let request: PurchaseRequest = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let now = clock::unix_now();

    mutate(state, "purchase_plan", |snap| {
        let receipt = ladder_commission::purchase::purchase_plan(snap, &request, now)?;
        let result = serde_json::json!({
            "purchase": receipt.purchase,
            "commissions": receipt.commissions,
        });
        Ok((Some(receipt.snapshot), result))
    })
    .await
}

/// Preview what reversing a recharge would deduct. Read-only.
pub async fn compute_impact(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txn_id = str_param(params, "transaction_id")?;
    let snapshot = read_snapshot(state).await?;
    let plan = ladder_reversal::plan::trace(&snapshot, txn_id)
        .map_err(|e| RpcError::from(CommandError::from(e)))?;

    let purchase_ids: Vec<&str> = plan.purchases.iter().map(|p| p.purchase_id.as_str()).collect();
    Ok(serde_json::json!({
        "impact": plan.impact,
        "user_id": plan.user_id,
        "purchase_ids": purchase_ids,
        "profits_count": plan.profits_count(),
        "commissions_count": plan.commissions_count(),
    }))
}

/// Reverse a fraudulent recharge and everything derived from it.
pub async fn apply_reversal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txn_id = str_param(params, "transaction_id")?;
    let actor = actor_param(params);
    let now = clock::unix_now();

    let result = mutate(state, "apply_reversal", |snap| {
        let outcome = ladder_reversal::apply::apply_reversal(snap, txn_id, actor, now)?;
        let result = serde_json::json!({
            "transaction_id": txn_id,
            "impact": outcome.impact,
            "cancelled_purchases": outcome.cancelled_purchases,
            "frozen_users": outcome.frozen_users,
        });
        Ok((Some(outcome.snapshot), result))
    })
    .await?;

    state
        .event_bus
        .emit(Event::now("ReversalApplied", result.clone()));
    Ok(result)
}

/// The whole ledger as JSON.
pub async fn get_snapshot(state: &Arc<DaemonState>) -> Result {
    to_json(&read_snapshot(state).await?)
}

/// Write a JSON backup of the ledger into `$data_dir/exports/`.
pub async fn export_snapshot(state: &Arc<DaemonState>) -> Result {
    let json = {
        let db = state.db.lock().await;
        ladder_db::snapshot::export_json(&db).map_err(|e| RpcError::from(CommandError::from(e)))?
    };

    let dir = state.config.data_dir().join("exports");
    let path = dir.join(format!("ledger-{}.json", clock::unix_now()));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| RpcError::internal_error(&format!("create {}: {e}", dir.display())))?;
    tokio::fs::write(&path, json.as_bytes())
        .await
        .map_err(|e| RpcError::internal_error(&format!("write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "ledger exported");
    Ok(serde_json::json!({"path": path.display().to_string(), "bytes": json.len()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::wallet;

    /// Returns `(user_id, referral_code)`.
    async fn register(
        state: &Arc<DaemonState>,
        name: &str,
        sponsor: Option<&str>,
    ) -> (String, String) {
        let user = wallet::register_user(
            state,
            &serde_json::json!({"name": name, "referred_by": sponsor}),
        )
        .await
        .expect("register");
        (
            user["id"].as_str().expect("id").to_string(),
            user["referral_code"].as_str().expect("code").to_string(),
        )
    }

    /// Approved recharge; returns its transaction id.
    async fn fund(state: &Arc<DaemonState>, user_id: &str, amount: i64) -> String {
        let txn = wallet::request_recharge(
            state,
            &serde_json::json!({"user_id": user_id, "amount": amount}),
        )
        .await
        .expect("recharge");
        let txn_id = txn["id"].as_str().expect("txn id").to_string();
        wallet::approve_recharge(
            state,
            &serde_json::json!({"transaction_id": txn_id, "actor_id": "admin-1"}),
        )
        .await
        .expect("approve");
        txn_id
    }

    #[tokio::test]
    async fn test_purchase_accrue_and_reverse() {
        let state = crate::test_state();
        let mut events = state.event_bus.subscribe();

        let (_, sponsor_code) = register(&state, "Sponsor", None).await;
        let (buyer, _) = register(&state, "Buyer", Some(&sponsor_code)).await;
        let recharge = fund(&state, &buyer, 1000).await;

        let receipt = purchase_plan(
            &state,
            &serde_json::json!({
                "user_id": buyer,
                "plan": {"name": "Starter", "price": 1000, "daily_income": 10, "total_days": 30},
            }),
        )
        .await
        .expect("purchase");
        assert_eq!(receipt["commissions"].as_array().expect("list").len(), 1);
        assert_eq!(receipt["purchase"]["funded_by_txn_id"], recharge.as_str());

        let accrual = run_accrual_cycle(&state, &serde_json::json!({})).await.expect("accrue");
        assert_eq!(accrual["ran"], true);
        assert_eq!(accrual["stats"]["total_distributed"], 10);

        let preview = compute_impact(&state, &serde_json::json!({"transaction_id": recharge}))
            .await
            .expect("preview");
        assert_eq!(preview["impact"]["total_deduction"], 1000 + 10 + 250);

        let applied = apply_reversal(
            &state,
            &serde_json::json!({"transaction_id": recharge, "actor_id": "admin-1"}),
        )
        .await
        .expect("reverse");
        assert_eq!(applied["impact"], preview["impact"]);
        assert_eq!(applied["cancelled_purchases"].as_array().expect("list").len(), 1);

        let snap = get_snapshot(&state).await.expect("snapshot");
        let last_log = snap["logs"].as_array().expect("logs").last().expect("entry");
        assert_eq!(last_log["action"], "FRAUD_REVERSAL");

        let mut changes = 0;
        while let Ok(event) = events.try_recv() {
            if event.event_type == "SnapshotChanged" {
                changes += 1;
            }
        }
        // 2 registrations, recharge request and approval, purchase, accrual, reversal
        assert_eq!(changes, 7);
    }

    #[tokio::test]
    async fn test_reversal_errors_map_to_rpc_codes() {
        let state = crate::test_state();
        let err = apply_reversal(&state, &serde_json::json!({"transaction_id": "txn-x"}))
            .await
            .expect_err("missing");
        assert_eq!(err.code, -32004);

        let err = compute_impact(&state, &serde_json::json!({}))
            .await
            .expect_err("no id");
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_daily_accrual_runs_once() {
        let state = crate::test_state();
        let first = force_daily_accrual(&state, &serde_json::json!({"actor_id": "admin-1"}))
            .await
            .expect("first");
        assert_eq!(first["ran"], true);

        let second = force_daily_accrual(&state, &serde_json::json!({"actor_id": "admin-1"}))
            .await
            .expect("second");
        assert_eq!(second["ran"], false);
        assert_eq!(second["reason"], "already_ran_today");

        let timer = maybe_run_daily_accrual(&state).await.expect("timer");
        assert_eq!(timer["ran"], false);
    }

    #[tokio::test]
    async fn test_manual_accrual_pays_once_per_day() {
        let state = crate::test_state();
        let (buyer, _) = register(&state, "Buyer", None).await;
        fund(&state, &buyer, 1000).await;
        purchase_plan(
            &state,
            &serde_json::json!({
                "user_id": buyer,
                "plan": {"name": "Starter", "price": 1000, "daily_income": 10, "total_days": 30},
            }),
        )
        .await
        .expect("purchase");

        let admin = serde_json::json!({"actor_id": "admin-1"});
        let first = run_accrual_cycle(&state, &admin).await.expect("first");
        assert_eq!(first["ran"], true);
        assert_eq!(first["stats"]["total_distributed"], 10);

        let second = run_accrual_cycle(&state, &admin).await.expect("second");
        assert_eq!(second["ran"], false);
        assert_eq!(second["reason"], "already_ran_today");

        let timer = maybe_run_daily_accrual(&state).await.expect("timer");
        assert_eq!(timer["ran"], false);

        let snap = get_snapshot(&state).await.expect("snapshot");
        let user = snap["users"]
            .as_array()
            .expect("users")
            .iter()
            .find(|u| u["id"] == buyer.as_str())
            .expect("buyer");
        assert_eq!(user["withdrawable_balance"], 10);
        assert_eq!(snap["purchases"][0]["days_remaining"], 29);
    }

    #[tokio::test]
    async fn test_repeated_freeze_emits_once() {
        let state = crate::test_state();
        let mut events = state.event_bus.subscribe();
        let params = serde_json::json!({"frozen": true, "actor_id": "admin-1"});

        let first = set_income_frozen(&state, &params).await.expect("freeze");
        assert_eq!(first["changed"], true);
        let second = set_income_frozen(&state, &params).await.expect("freeze again");
        assert_eq!(second["changed"], false);

        let mut frozen = 0;
        let mut changes = 0;
        while let Ok(event) = events.try_recv() {
            match event.event_type.as_str() {
                "IncomeFrozen" => frozen += 1,
                "SnapshotChanged" => changes += 1,
                _ => {}
            }
        }
        assert_eq!(frozen, 1);
        assert_eq!(changes, 1);
    }

    #[tokio::test]
    async fn test_set_admin_config() {
        let state = crate::test_state();
        let mut events = state.event_bus.subscribe();

        let result = set_admin_config(
            &state,
            &serde_json::json!({
                "commission_l1": 10,
                "automatic_income_time": "06:30",
                "min_withdrawal": 500,
                "actor_id": "admin-1",
            }),
        )
        .await
        .expect("update");
        assert_eq!(result["changed"], true);
        assert_eq!(result["admin"]["commission_l1"], 10);

        let snap = get_snapshot(&state).await.expect("snapshot");
        assert_eq!(snap["admin"]["automatic_income_time"], "06:30");
        assert_eq!(snap["admin"]["min_withdrawal"], 500);
        let last_log = snap["logs"].as_array().expect("logs").last().expect("entry");
        assert_eq!(last_log["action"], "ADMIN_CONFIG_CHANGED");

        let again = set_admin_config(&state, &serde_json::json!({"commission_l1": 10}))
            .await
            .expect("same value");
        assert_eq!(again["changed"], false);

        let mut changed_events = 0;
        while let Ok(event) = events.try_recv() {
            if event.event_type == "AdminConfigChanged" {
                changed_events += 1;
            }
        }
        assert_eq!(changed_events, 1);

        for bad in [
            serde_json::json!({"commission_l3": 101}),
            serde_json::json!({"automatic_income_time": "25:00"}),
            serde_json::json!({"min_withdrawal": -5}),
            serde_json::json!({"actor_id": "admin-1"}),
        ] {
            let err = set_admin_config(&state, &bad).await.expect_err("rejected");
            assert_eq!(err.code, -32602);
        }
    }

    #[tokio::test]
    async fn test_income_freeze_round_trip() {
        let state = crate::test_state();
        set_income_frozen(&state, &serde_json::json!({"frozen": true, "actor_id": "admin-1"}))
            .await
            .expect("freeze");
        let snap = get_snapshot(&state).await.expect("snapshot");
        assert_eq!(snap["admin"]["income_frozen"], true);

        let err = set_income_frozen(&state, &serde_json::json!({}))
            .await
            .expect_err("missing flag");
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_export_snapshot_writes_file() {
        let state = crate::test_state();
        let result = export_snapshot(&state).await.expect("export");
        let path = std::path::PathBuf::from(result["path"].as_str().expect("path"));
        let content = std::fs::read_to_string(&path).expect("read export");
        assert!(content.contains("\"revision\": 0"));
        let _ = std::fs::remove_file(&path);
    }
}
