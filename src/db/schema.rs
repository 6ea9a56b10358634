//! Schema initialization for the primary and audit databases.
//!
//! Tenant-owned tables carry a NOT NULL `org_id`; the scoping enforcer
//! guarantees every query against them filters on it.

use rusqlite::Connection;

use crate::error::Result;

pub fn init_primary(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            name            TEXT NOT NULL,
            password_hash   TEXT NOT NULL,
            email_verified  INTEGER NOT NULL DEFAULT 0,
            active          INTEGER NOT NULL DEFAULT 1,
            active_org_id   TEXT,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organizations (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE,
            status      TEXT NOT NULL DEFAULT 'active',
            plan        TEXT NOT NULL DEFAULT 'free',
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memberships (
            id              TEXT PRIMARY KEY,
            org_id          TEXT NOT NULL REFERENCES organizations(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            role            TEXT NOT NULL,
            functional_role TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            UNIQUE (org_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL REFERENCES users(id),
            token_hash     TEXT NOT NULL UNIQUE,
            created_at     INTEGER NOT NULL,
            last_active_at INTEGER NOT NULL,
            expires_at     INTEGER NOT NULL,
            ip_address     TEXT,
            user_agent     TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS platform_admins (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            email       TEXT NOT NULL,
            role        TEXT NOT NULL,
            granted_by  TEXT,
            created_at  INTEGER NOT NULL,
            revoked_at  INTEGER,
            revoked_by  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_platform_admins_user ON platform_admins(user_id);

        CREATE TABLE IF NOT EXISTS otp_codes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            code_hash   TEXT NOT NULL,
            expires_at  INTEGER NOT NULL,
            consumed_at INTEGER,
            created_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_otp_codes_user ON otp_codes(user_id);

        CREATE TABLE IF NOT EXISTS forecasts (
            id          TEXT PRIMARY KEY,
            org_id      TEXT NOT NULL REFERENCES organizations(id),
            name        TEXT NOT NULL,
            period      TEXT NOT NULL,
            quantity    INTEGER NOT NULL,
            status      TEXT NOT NULL DEFAULT 'draft',
            created_by  TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_forecasts_org ON forecasts(org_id);",
    )?;
    Ok(())
}

pub fn init_audit(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS admin_actions (
            id           TEXT PRIMARY KEY,
            timestamp    INTEGER NOT NULL,
            actor_id     TEXT NOT NULL,
            actor_email  TEXT NOT NULL,
            grant_source TEXT,
            action       TEXT NOT NULL,
            target_type  TEXT NOT NULL,
            target_id    TEXT NOT NULL,
            before_state TEXT,
            after_state  TEXT,
            reason       TEXT,
            org_id       TEXT,
            ip_address   TEXT,
            user_agent   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_admin_actions_actor ON admin_actions(actor_id);
        CREATE INDEX IF NOT EXISTS idx_admin_actions_target ON admin_actions(target_type, target_id);

        CREATE TABLE IF NOT EXISTS activity_events (
            id          TEXT PRIMARY KEY,
            timestamp   INTEGER NOT NULL,
            actor_id    TEXT NOT NULL,
            actor_email TEXT NOT NULL,
            action      TEXT NOT NULL,
            target_type TEXT NOT NULL,
            target_id   TEXT NOT NULL,
            org_id      TEXT,
            details     TEXT,
            ip_address  TEXT,
            user_agent  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_activity_events_actor ON activity_events(actor_id);
        CREATE INDEX IF NOT EXISTS idx_activity_events_org ON activity_events(org_id);",
    )?;
    Ok(())
}
