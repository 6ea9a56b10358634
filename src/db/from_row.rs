//! Row-mapping helpers: per-entity column lists plus generic query functions.
//!
//! Column list constants keep SELECT statements and `FromRow` impls in sync;
//! add columns in both places or row indices shift.

use rusqlite::types::Type;
use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, T::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, T::from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Parse a TEXT column into a closed enum; a stored value outside the enum is
/// data corruption and surfaces as a conversion error.
pub fn parse_enum<T: std::str::FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid enum value: {raw}").into(),
        )
    })
}

fn parse_json(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

pub const USER_COLS: &str =
    "id, email, name, password_hash, email_verified, active, active_org_id, created_at, updated_at";

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            email_verified: row.get::<_, i64>(4)? != 0,
            active: row.get::<_, i64>(5)? != 0,
            active_org_id: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

pub const ORGANIZATION_COLS: &str = "id, name, slug, status, plan, created_at, updated_at";

impl FromRow for Organization {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Organization {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            status: parse_enum(row, 3)?,
            plan: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

pub const MEMBERSHIP_COLS: &str = "id, org_id, user_id, role, functional_role, created_at";

impl FromRow for Membership {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Membership {
            id: row.get(0)?,
            org_id: row.get(1)?,
            user_id: row.get(2)?,
            role: parse_enum(row, 3)?,
            functional_role: parse_enum(row, 4)?,
            created_at: row.get(5)?,
        })
    }
}

pub const MEMBERSHIP_WITH_ORG_COLS: &str =
    "m.id, m.org_id, o.name, o.slug, o.status, m.role, m.functional_role, m.created_at";

impl FromRow for MembershipWithOrg {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MembershipWithOrg {
            id: row.get(0)?,
            org_id: row.get(1)?,
            org_name: row.get(2)?,
            org_slug: row.get(3)?,
            org_status: parse_enum(row, 4)?,
            role: parse_enum(row, 5)?,
            functional_role: parse_enum(row, 6)?,
            created_at: row.get(7)?,
        })
    }
}

pub const SESSION_COLS: &str =
    "id, user_id, token_hash, created_at, last_active_at, expires_at, ip_address, user_agent";

impl FromRow for Session {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            token_hash: row.get(2)?,
            created_at: row.get(3)?,
            last_active_at: row.get(4)?,
            expires_at: row.get(5)?,
            ip_address: row.get(6)?,
            user_agent: row.get(7)?,
        })
    }
}

pub const PLATFORM_ADMIN_COLS: &str =
    "id, user_id, email, role, granted_by, created_at, revoked_at, revoked_by";

impl FromRow for PlatformAdmin {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PlatformAdmin {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            role: parse_enum(row, 3)?,
            granted_by: row.get(4)?,
            created_at: row.get(5)?,
            revoked_at: row.get(6)?,
            revoked_by: row.get(7)?,
        })
    }
}

pub const OTP_CODE_COLS: &str = "id, user_id, code_hash, expires_at, consumed_at, created_at";

impl FromRow for OtpCode {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(OtpCode {
            id: row.get(0)?,
            user_id: row.get(1)?,
            code_hash: row.get(2)?,
            expires_at: row.get(3)?,
            consumed_at: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

pub const FORECAST_COLS: &str =
    "id, org_id, name, period, quantity, status, created_by, created_at, updated_at";

impl FromRow for Forecast {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Forecast {
            id: row.get(0)?,
            org_id: row.get(1)?,
            name: row.get(2)?,
            period: row.get(3)?,
            quantity: row.get(4)?,
            status: parse_enum(row, 5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

pub const ADMIN_ACTION_COLS: &str = "id, timestamp, actor_id, actor_email, grant_source, action, \
     target_type, target_id, before_state, after_state, reason, org_id, ip_address, user_agent";

impl FromRow for AdminAction {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let grant_source: Option<String> = row.get(4)?;
        Ok(AdminAction {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            actor_id: row.get(2)?,
            actor_email: row.get(3)?,
            grant_source: grant_source.and_then(|s| s.parse().ok()),
            action: row.get(5)?,
            target_type: row.get(6)?,
            target_id: row.get(7)?,
            before: parse_json(row.get(8)?),
            after: parse_json(row.get(9)?),
            reason: row.get(10)?,
            org_id: row.get(11)?,
            ip_address: row.get(12)?,
            user_agent: row.get(13)?,
        })
    }
}

pub const ACTIVITY_EVENT_COLS: &str = "id, timestamp, actor_id, actor_email, action, target_type, \
     target_id, org_id, details, ip_address, user_agent";

impl FromRow for ActivityEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ActivityEvent {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            actor_id: row.get(2)?,
            actor_email: row.get(3)?,
            action: row.get(4)?,
            target_type: row.get(5)?,
            target_id: row.get(6)?,
            org_id: row.get(7)?,
            details: parse_json(row.get(8)?),
            ip_address: row.get(9)?,
            user_agent: row.get(10)?,
        })
    }
}
