//! Once-per-day accrual gate.
//!
//! The admin record carries `last_income_run`, an RFC 3339 stamp written in
//! the operating timezone. A cycle runs only if that stamp's date is not
//! today's date in the same timezone.
//!
//! - **Automatic** runs additionally require `automatic_income_enabled` and a
//!   local time of day at or past `automatic_income_time`.
//! - **Forced** runs skip both of those checks but still respect the stamp,
//!   and still write it, so the automatic path does not pay a second time
//!   the same day.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use ladder_types::admin::AdminConfig;
use ladder_types::snapshot::LedgerSnapshot;
use serde::{Deserialize, Serialize};

use crate::distribution::{run_accrual_cycle, AccrualOutcome};
use crate::{AccrualError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualTrigger {
    /// Timer-driven; honors the enabled flag and the time of day.
    Automatic,
    /// Operator-driven; ignores the time of day.
    Forced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRanToday,
    AutomaticDisabled,
    BeforeScheduledTime,
}

#[derive(Clone, Debug)]
pub enum ScheduleDecision {
    /// The cycle ran and the stamp was written into the returned snapshot.
    Ran(AccrualOutcome),
    Skipped(SkipReason),
}

impl ScheduleDecision {
    pub fn ran(&self) -> bool {
        matches!(self, Self::Ran(_))
    }
}

/// Parse an `"HH:MM"` admin time.
///
/// # Errors
///
/// - [`AccrualError::InvalidScheduleTime`] if the value is not `HH:MM`
pub fn parse_income_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AccrualError::InvalidScheduleTime(value.to_string()))
}

/// Date of the last accrual run in `tz`, if a readable stamp exists.
pub fn last_run_date(admin: &AdminConfig, tz: &FixedOffset) -> Option<NaiveDate> {
    let stamp = admin.last_income_run.as_deref()?;
    match DateTime::parse_from_rfc3339(stamp) {
        Ok(at) => Some(at.with_timezone(tz).date_naive()),
        Err(e) => {
            tracing::warn!(
                stamp,
                error = %e,
                "unreadable last income run stamp, treating as never run"
            );
            None
        }
    }
}

/// Run the daily accrual cycle if the gate allows it.
///
/// # Errors
///
/// - [`AccrualError::InvalidScheduleTime`] for an automatic run with a malformed time
/// - any error from [`run_accrual_cycle`]
pub fn maybe_run_daily_accrual(
    snapshot: &LedgerSnapshot,
    now: DateTime<Utc>,
    tz: FixedOffset,
    trigger: AccrualTrigger,
    actor: &str,
) -> Result<ScheduleDecision> {
    let local = now.with_timezone(&tz);
    let today = local.date_naive();

    if last_run_date(&snapshot.admin, &tz) == Some(today) {
        tracing::debug!(%today, "accrual already ran today");
        return Ok(ScheduleDecision::Skipped(SkipReason::AlreadyRanToday));
    }

    if trigger == AccrualTrigger::Automatic {
        if !snapshot.admin.automatic_income_enabled {
            return Ok(ScheduleDecision::Skipped(SkipReason::AutomaticDisabled));
        }
        let threshold = parse_income_time(&snapshot.admin.automatic_income_time)?;
        if local.time() < threshold {
            return Ok(ScheduleDecision::Skipped(SkipReason::BeforeScheduledTime));
        }
    }

    let unix = u64::try_from(now.timestamp()).unwrap_or_default();
    let mut outcome = run_accrual_cycle(snapshot, actor, unix)?;
    outcome.snapshot.admin.last_income_run = Some(local.to_rfc3339());

    tracing::info!(
        %today,
        ?trigger,
        total = outcome.stats.total_distributed,
        "daily accrual ran"
    );

    Ok(ScheduleDecision::Ran(outcome))
}
