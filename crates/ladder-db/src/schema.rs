//! SQL schema definitions.

/// Complete schema for the v1 ledger database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Users
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    balance INTEGER NOT NULL DEFAULT 0,
    withdrawable_balance INTEGER NOT NULL DEFAULT 0,
    total_invested INTEGER NOT NULL DEFAULT 0,
    total_withdrawn INTEGER NOT NULL DEFAULT 0,
    referral_code TEXT NOT NULL UNIQUE,
    referred_by TEXT,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'frozen', 'banned')),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_referred_by ON users(referred_by);

-- ============================================================
-- Purchases
-- ============================================================

CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    plan_name TEXT NOT NULL,
    price INTEGER NOT NULL,
    daily_income INTEGER NOT NULL,
    days_remaining INTEGER NOT NULL,
    total_days INTEGER NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('active', 'completed', 'cancelled')),
    funded_by_txn_id TEXT,
    created_at INTEGER NOT NULL,
    CHECK (days_remaining <= total_days)
);

CREATE INDEX IF NOT EXISTS idx_purchases_user ON purchases(user_id);
CREATE INDEX IF NOT EXISTS idx_purchases_funded_by ON purchases(funded_by_txn_id);

-- ============================================================
-- Transactions (seq keeps append order)
-- ============================================================

CREATE TABLE IF NOT EXISTS transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL REFERENCES users(id),
    type TEXT NOT NULL
        CHECK (type IN ('recharge', 'withdraw', 'purchase', 'profit', 'commission')),
    amount INTEGER NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('pending', 'approved', 'rejected')),
    source_purchase_id TEXT,
    level INTEGER,
    details TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    CHECK (type NOT IN ('profit', 'commission') OR source_purchase_id IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
CREATE INDEX IF NOT EXISTS idx_transactions_source ON transactions(source_purchase_id);

-- ============================================================
-- Admin configuration (single row)
-- ============================================================

CREATE TABLE IF NOT EXISTS admin_config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    income_frozen INTEGER NOT NULL DEFAULT 0,
    automatic_income_enabled INTEGER NOT NULL DEFAULT 1,
    automatic_income_time TEXT NOT NULL DEFAULT '00:00',
    last_income_run TEXT,
    commission_l1 INTEGER NOT NULL,
    commission_l2 INTEGER NOT NULL,
    commission_l3 INTEGER NOT NULL,
    min_withdrawal INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Audit log (capped by the writer)
-- ============================================================

CREATE TABLE IF NOT EXISTS audit_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    action TEXT NOT NULL,
    details TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    actor_id TEXT NOT NULL
);

-- ============================================================
-- Store metadata
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    revision INTEGER NOT NULL DEFAULT 0
);
"#;
