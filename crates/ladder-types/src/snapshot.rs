//! The whole-ledger snapshot.
//!
//! Engines never mutate a snapshot they were handed. They clone it, apply
//! every field change of one logical operation to the clone, and return the
//! clone only if all steps succeeded. The store then commits it in a single
//! write, so no intermediate state is ever visible.

use serde::{Deserialize, Serialize};

use crate::admin::AdminConfig;
use crate::audit::AuditEntry;
use crate::purchase::Purchase;
use crate::transaction::Transaction;
use crate::user::User;
use crate::AUDIT_LOG_CAP;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub users: Vec<User>,
    pub purchases: Vec<Purchase>,
    /// Append order.
    pub transactions: Vec<Transaction>,
    pub admin: AdminConfig,
    /// Oldest first, at most [`AUDIT_LOG_CAP`] entries.
    pub logs: Vec<AuditEntry>,
    /// Store revision this snapshot was read at. Used for compare-and-swap.
    #[serde(default)]
    pub revision: u64,
}

impl LedgerSnapshot {
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// Resolve one link of a referral chain.
    pub fn user_by_referral_code(&self, code: &str) -> Option<&User> {
        self.users.iter().find(|u| u.referral_code == code)
    }

    pub fn purchase(&self, id: &str) -> Option<&Purchase> {
        self.purchases.iter().find(|p| p.id == id)
    }

    pub fn purchase_mut(&mut self, id: &str) -> Option<&mut Purchase> {
        self.purchases.iter_mut().find(|p| p.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    /// Append an audit entry, dropping the oldest beyond the cap.
    pub fn push_log(&mut self, entry: AuditEntry) {
        self.logs.push(entry);
        if self.logs.len() > AUDIT_LOG_CAP {
            let excess = self.logs.len() - AUDIT_LOG_CAP;
            self.logs.drain(..excess);
        }
    }
}
