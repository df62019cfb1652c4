//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Every
//! mutating command goes through [`mutate`], which runs the engine inside a
//! serialized store transaction and announces the new revision.

pub mod ledger;
pub mod wallet;

use std::sync::Arc;

use ladder_accrual::AccrualError;
use ladder_commission::CommissionError;
use ladder_db::DbError;
use ladder_reversal::ReversalError;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_wallet::WalletError;
use serde_json::Value;

use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Any failure of a ledger command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Commission(#[from] CommissionError),

    #[error(transparent)]
    Accrual(#[from] AccrualError),

    #[error(transparent)]
    Reversal(#[from] ReversalError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl From<CommandError> for RpcError {
    fn from(err: CommandError) -> Self {
        let detail = err.to_string();
        match err {
            CommandError::Db(DbError::Conflict { .. }) => RpcError::conflict(&detail),
            CommandError::Db(DbError::NotFound(_)) => RpcError::not_found(&detail),
            CommandError::Db(_) => RpcError::internal_error(&detail),

            CommandError::Commission(CommissionError::UserNotFound(_)) => {
                RpcError::not_found(&detail)
            }
            CommandError::Commission(CommissionError::InsufficientBalance {
                available,
                required,
            }) => RpcError::insufficient_balance(required, available),
            CommandError::Commission(CommissionError::Overflow) => {
                RpcError::internal_error(&detail)
            }
            CommandError::Commission(_) => RpcError::invalid_params(&detail),

            CommandError::Accrual(AccrualError::UserNotFound { .. }) => {
                RpcError::not_found(&detail)
            }
            CommandError::Accrual(AccrualError::InvalidScheduleTime(_))
            | CommandError::Accrual(AccrualError::InvalidSetting(_)) => {
                RpcError::invalid_params(&detail)
            }
            CommandError::Accrual(AccrualError::Overflow) => RpcError::internal_error(&detail),

            CommandError::Reversal(ReversalError::NotFound(_))
            | CommandError::Reversal(ReversalError::UserNotFound(_)) => {
                RpcError::not_found(&detail)
            }
            CommandError::Reversal(ReversalError::Overflow) => RpcError::internal_error(&detail),
            CommandError::Reversal(_) => RpcError::invalid_params(&detail),

            CommandError::Wallet(WalletError::UserNotFound(_))
            | CommandError::Wallet(WalletError::TransactionNotFound(_)) => {
                RpcError::not_found(&detail)
            }
            CommandError::Wallet(WalletError::InsufficientFunds {
                available,
                required,
            }) => RpcError::insufficient_balance(required, available),
            CommandError::Wallet(WalletError::Overflow) => RpcError::internal_error(&detail),
            CommandError::Wallet(_) => RpcError::invalid_params(&detail),
        }
    }
}

/// Run `f` against the current snapshot inside one store transaction.
///
/// `f` returns the replacement snapshot (or `None` for a no-op) and the RPC
/// result. A committed change emits `SnapshotChanged`.
pub(crate) async fn mutate<F>(
    state: &Arc<DaemonState>,
    method: &str,
    f: F,
) -> Result<Value, RpcError>
where
    F: FnOnce(&LedgerSnapshot) -> Result<(Option<LedgerSnapshot>, Value), CommandError>,
{
    let applied = {
        let mut db = state.db.lock().await;
        ladder_db::snapshot::apply(&mut db, f).map_err(|e| {
            tracing::warn!(method, error = %e, "command failed");
            RpcError::from(e)
        })?
    };

    if let Some(revision) = applied.committed_revision {
        tracing::info!(method, revision, "ledger updated");
        state.event_bus.emit(Event::now(
            "SnapshotChanged",
            serde_json::json!({"revision": revision, "method": method}),
        ));
    }
    Ok(applied.value)
}

/// Read the current snapshot.
pub(crate) async fn read_snapshot(state: &Arc<DaemonState>) -> Result<LedgerSnapshot, RpcError> {
    let db = state.db.lock().await;
    ladder_db::snapshot::read(&db).map_err(|e| RpcError::from(CommandError::from(e)))
}

/// Required string parameter.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Required integer amount parameter.
pub(crate) fn amount_param(params: &Value, name: &str) -> Result<i64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Acting admin id, or the system actor when the caller does not name one.
pub(crate) fn actor_param(params: &Value) -> &str {
    params
        .get("actor_id")
        .and_then(|v| v.as_str())
        .unwrap_or(ladder_types::SYSTEM_ACTOR)
}

/// Serialize a value into the RPC result.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&e.to_string()))
}
