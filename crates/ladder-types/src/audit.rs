//! Audit log entries for privileged mutations.

use serde::{Deserialize, Serialize};

use crate::{new_id, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    /// Upper-case action tag, e.g. `FRAUD_REVERSAL`.
    pub action: String,
    pub details: String,
    pub timestamp: Timestamp,
    pub actor_id: String,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        details: impl Into<String>,
        actor_id: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: new_id("log"),
            action: action.into(),
            details: details.into(),
            timestamp,
            actor_id: actor_id.into(),
        }
    }
}
