//! Account and wallet command handlers.

use std::str::FromStr;
use std::sync::Arc;

use ladder_types::user::UserStatus;
use serde_json::Value;

use super::{actor_param, amount_param, mutate, str_param};
use crate::clock;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Register a user, optionally under a sponsor's referral code.
pub async fn register_user(state: &Arc<DaemonState>, params: &Value) -> Result {
    let name = str_param(params, "name")?;
    let referred_by = params.get("referred_by").and_then(|v| v.as_str());
    let now = clock::unix_now();

    mutate(state, "register_user", |snap| {
        let (next, user) = ladder_wallet::account::register_user(snap, name, referred_by, now)?;
        Ok((Some(next), serde_json::json!(user)))
    })
    .await
}

/// Freeze, ban or reactivate a user.
pub async fn set_user_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let status = UserStatus::from_str(str_param(params, "status")?)
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let actor = actor_param(params);
    let now = clock::unix_now();

    let result = mutate(state, "set_user_status", |snap| {
        let next = ladder_wallet::account::set_user_status(snap, user_id, status, actor, now)?;
        Ok((Some(next), serde_json::json!({"user_id": user_id, "status": status})))
    })
    .await?;

    state
        .event_bus
        .emit(Event::now("UserStatusChanged", result.clone()));
    Ok(result)
}

/// File a pending deposit.
pub async fn request_recharge(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let amount = amount_param(params, "amount")?;
    let now = clock::unix_now();

    mutate(state, "request_recharge", |snap| {
        let (next, txn) = ladder_wallet::recharge::request_recharge(snap, user_id, amount, now)?;
        Ok((Some(next), serde_json::json!(txn)))
    })
    .await
}

/// Approve a pending deposit.
pub async fn approve_recharge(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txn_id = str_param(params, "transaction_id")?;
    let actor = actor_param(params);
    let now = clock::unix_now();

    mutate(state, "approve_recharge", |snap| {
        let next = ladder_wallet::recharge::approve_recharge(snap, txn_id, actor, now)?;
        Ok((Some(next), serde_json::json!({"transaction_id": txn_id, "status": "approved"})))
    })
    .await
}

/// File a withdrawal; the amount is held immediately.
pub async fn request_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let amount = amount_param(params, "amount")?;
    let now = clock::unix_now();

    mutate(state, "request_withdrawal", |snap| {
        let (next, txn) = ladder_wallet::withdraw::request_withdrawal(snap, user_id, amount, now)?;
        Ok((Some(next), serde_json::json!(txn)))
    })
    .await
}

/// Approve a pending withdrawal.
pub async fn approve_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txn_id = str_param(params, "transaction_id")?;
    let actor = actor_param(params);
    let now = clock::unix_now();

    mutate(state, "approve_withdrawal", |snap| {
        let next = ladder_wallet::withdraw::approve_withdrawal(snap, txn_id, actor, now)?;
        Ok((Some(next), serde_json::json!({"transaction_id": txn_id, "status": "approved"})))
    })
    .await
}

/// Reject a pending recharge or withdrawal.
pub async fn reject_transaction(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txn_id = str_param(params, "transaction_id")?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("rejected by admin");
    let actor = actor_param(params);
    let now = clock::unix_now();

    mutate(state, "reject_transaction", |snap| {
        let next = ladder_wallet::withdraw::reject_transaction(snap, txn_id, actor, reason, now)?;
        Ok((Some(next), serde_json::json!({"transaction_id": txn_id, "status": "rejected"})))
    })
    .await
}
