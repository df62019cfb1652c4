//! In-process accrual timer.
//!
//! Polls the scheduler gate every `tick_interval_secs`. The gate itself
//! decides whether today's run is due, so a missed tick only delays the run
//! and a restart never pays twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::commands;
use crate::DaemonState;

/// Run until a shutdown signal arrives.
pub async fn run(state: Arc<DaemonState>, mut shutdown_rx: broadcast::Receiver<()>) {
    let period = Duration::from_secs(state.config.schedule.tick_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_secs = period.as_secs(), "accrual timer started");

    loop {
        tokio::select! {
            _ = interval.tick() => tick(&state).await,
            _ = shutdown_rx.recv() => {
                info!("accrual timer stopped");
                break;
            }
        }
    }
}

async fn tick(state: &Arc<DaemonState>) {
    match commands::ledger::maybe_run_daily_accrual(state).await {
        Ok(result) if result["ran"] == serde_json::Value::Bool(true) => {
            info!(stats = %result["stats"], "daily accrual ran");
        }
        Ok(result) => debug!(reason = %result["reason"], "daily accrual not due"),
        // Retried on the next tick
        Err(e) => warn!(code = e.code, error = %e.message, data = ?e.data, "daily accrual failed"),
    }
}
