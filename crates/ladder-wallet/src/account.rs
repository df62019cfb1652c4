//! User registration and admin status changes.

use ladder_types::audit::AuditEntry;
use ladder_types::snapshot::LedgerSnapshot;
use ladder_types::user::{User, UserStatus};
use ladder_types::{new_id, Timestamp};

use crate::{Result, WalletError};

/// Length of a generated referral code.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Register a new active user.
///
/// `referred_by` is the sponsor's referral code; an empty string counts as
/// no sponsor.
///
/// # Errors
///
/// - [`WalletError::InvalidName`] if `name` is blank
/// - [`WalletError::UnknownReferralCode`] if no user owns `referred_by`
pub fn register_user(
    snapshot: &LedgerSnapshot,
    name: &str,
    referred_by: Option<&str>,
    now: Timestamp,
) -> Result<(LedgerSnapshot, User)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WalletError::InvalidName);
    }
    let sponsor = match referred_by.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            snapshot
                .user_by_referral_code(code)
                .ok_or_else(|| WalletError::UnknownReferralCode(code.to_string()))?;
            Some(code.to_string())
        }
        None => None,
    };

    let user = User::new(
        new_id("usr"),
        name,
        fresh_referral_code(snapshot),
        sponsor,
        now,
    );
    let mut next = snapshot.clone();
    next.users.push(user.clone());

    tracing::info!(
        user = %user.id,
        code = %user.referral_code,
        sponsor = user.referred_by.as_deref().unwrap_or("-"),
        "user registered"
    );
    Ok((next, user))
}

/// Set a user's account status. Setting the current status is a no-op.
///
/// # Errors
///
/// - [`WalletError::UserNotFound`]
pub fn set_user_status(
    snapshot: &LedgerSnapshot,
    user_id: &str,
    status: UserStatus,
    actor: &str,
    now: Timestamp,
) -> Result<LedgerSnapshot> {
    let mut next = snapshot.clone();
    let user = next
        .user_mut(user_id)
        .ok_or_else(|| WalletError::UserNotFound(user_id.to_string()))?;
    let previous = user.status;
    if previous == status {
        return Ok(next);
    }
    user.status = status;

    next.push_log(AuditEntry::new(
        "USER_STATUS_CHANGED",
        format!("User {user_id}: {previous} -> {status}"),
        actor,
        now,
    ));
    tracing::info!(user = user_id, %previous, %status, actor, "user status changed");
    Ok(next)
}

fn fresh_referral_code(snapshot: &LedgerSnapshot) -> String {
    loop {
        let code: String = new_id("ref")
            .trim_start_matches("ref-")
            .chars()
            .take(REFERRAL_CODE_LEN)
            .collect::<String>()
            .to_ascii_uppercase();
        if snapshot.user_by_referral_code(&code).is_none() {
            return code;
        }
    }
}
