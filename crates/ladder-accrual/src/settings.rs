//! Admin settings.
//!
//! Commission rates, the automatic income schedule and the withdrawal floor
//! are edited together through [`update_admin_config`]. The income freeze has
//! its own switch in [`crate::breaker`], and `last_income_run` belongs to the
//! scheduler, so neither can be set here.

use ladder_commission::cascade::CommissionRates;
use ladder_types::admin::AdminConfig;
use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::scheduler::parse_income_time;
use crate::{AccrualError, Result};

/// Partial update of the admin record. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfigUpdate {
    pub commission_l1: Option<u8>,
    pub commission_l2: Option<u8>,
    pub commission_l3: Option<u8>,
    pub automatic_income_enabled: Option<bool>,
    /// `"HH:MM"` in the operating timezone.
    pub automatic_income_time: Option<String>,
    pub min_withdrawal: Option<Amount>,
}

impl AdminConfigUpdate {
    /// Whether the update names no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Apply `update` to the admin record.
///
/// Returns an identical copy with no audit entry when nothing changes.
///
/// # Errors
///
/// - [`AccrualError::InvalidSetting`] for a rate above 100 or a negative
///   withdrawal minimum
/// - [`AccrualError::InvalidScheduleTime`] if the time is not `HH:MM`
pub fn update_admin_config(
    snapshot: &LedgerSnapshot,
    update: &AdminConfigUpdate,
    actor: &str,
    now: Timestamp,
) -> Result<LedgerSnapshot> {
    let current = &snapshot.admin;
    let mut admin = current.clone();

    if let Some(rate) = update.commission_l1 {
        admin.commission_l1 = rate;
    }
    if let Some(rate) = update.commission_l2 {
        admin.commission_l2 = rate;
    }
    if let Some(rate) = update.commission_l3 {
        admin.commission_l3 = rate;
    }
    CommissionRates::from_admin(&admin)
        .validate()
        .map_err(|e| AccrualError::InvalidSetting(e.to_string()))?;

    if let Some(enabled) = update.automatic_income_enabled {
        admin.automatic_income_enabled = enabled;
    }
    if let Some(time) = &update.automatic_income_time {
        admin.automatic_income_time = parse_income_time(time)?.format("%H:%M").to_string();
    }
    if let Some(minimum) = update.min_withdrawal {
        if minimum < 0 {
            return Err(AccrualError::InvalidSetting(format!(
                "minimum withdrawal must be non-negative, got {minimum}"
            )));
        }
        admin.min_withdrawal = minimum;
    }

    let changes = describe_changes(current, &admin);
    let mut next = snapshot.clone();
    if changes.is_empty() {
        return Ok(next);
    }
    next.admin = admin;
    next.push_log(AuditEntry::new(
        "ADMIN_CONFIG_CHANGED",
        changes.join("; "),
        actor,
        now,
    ));

    tracing::info!(actor, changes = changes.len(), "admin settings changed");
    Ok(next)
}

fn describe_changes(before: &AdminConfig, after: &AdminConfig) -> Vec<String> {
    let mut changes = Vec::new();
    let mut note = |field: &str, old: String, new: String| {
        if old != new {
            changes.push(format!("{field}: {old} -> {new}"));
        }
    };
    note(
        "commission_l1",
        before.commission_l1.to_string(),
        after.commission_l1.to_string(),
    );
    note(
        "commission_l2",
        before.commission_l2.to_string(),
        after.commission_l2.to_string(),
    );
    note(
        "commission_l3",
        before.commission_l3.to_string(),
        after.commission_l3.to_string(),
    );
    note(
        "automatic_income_enabled",
        before.automatic_income_enabled.to_string(),
        after.automatic_income_enabled.to_string(),
    );
    note(
        "automatic_income_time",
        before.automatic_income_time.clone(),
        after.automatic_income_time.clone(),
    );
    note(
        "min_withdrawal",
        before.min_withdrawal.to_string(),
        after.min_withdrawal.to_string(),
    );
    changes
}
