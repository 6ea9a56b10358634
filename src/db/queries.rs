use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;
use crate::tenancy::{ScopeGuard, Scoped, ScopedWrite, Unscoped};

use super::from_row::{
    FORECAST_COLS, MEMBERSHIP_COLS, MEMBERSHIP_WITH_ORG_COLS, ORGANIZATION_COLS,
    PLATFORM_ADMIN_COLS, OTP_CODE_COLS, SESSION_COLS, USER_COLS, query_all, query_one,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query for efficiency.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

/// Create a user. The email is normalized to lowercase for case-insensitive
/// uniqueness and lookups.
pub fn create_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = email.trim().to_lowercase();

    let inserted = conn.execute(
        "INSERT INTO users (id, email, name, password_hash, email_verified, active, active_org_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, 1, NULL, ?5, ?6)",
        params![&id, &email, name, password_hash, now, now],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(User {
        id,
        email,
        name: name.to_string(),
        password_hash: password_hash.to_string(),
        email_verified: false,
        active: true,
        active_org_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        params![id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        params![email],
    )
}

pub fn list_users_paginated(
    conn: &Connection,
    _access: &Unscoped,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            USER_COLS
        ),
        params![limit, offset],
    )?;
    Ok((items, total))
}

pub fn set_user_active(conn: &Connection, id: &str, active: bool) -> Result<bool> {
    UpdateBuilder::new("users", id)
        .with_updated_at()
        .set("active", active as i64)
        .execute(conn)
}

pub fn set_email_verified(conn: &Connection, id: &str) -> Result<bool> {
    UpdateBuilder::new("users", id)
        .with_updated_at()
        .set("email_verified", 1i64)
        .execute(conn)
}

/// Write the active-organization pointer. The organization switch workflow is
/// the only caller; every other path takes an already-resolved org id.
pub(crate) fn set_active_org(
    conn: &Connection,
    user_id: &str,
    org_id: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET active_org_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![org_id, now(), user_id],
    )?;
    Ok(affected > 0)
}

/// Hard-delete the user row. Callers own the ordering: snapshot recorded
/// first, trails and dependent rows removed before this call.
pub fn delete_user_row(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ============ Organizations ============

pub fn create_organization(conn: &Connection, input: &CreateOrganization) -> Result<Organization> {
    let id = gen_id();
    let now = now();
    let plan = input.plan.clone().unwrap_or_else(|| "free".to_string());

    let inserted = conn.execute(
        "INSERT INTO organizations (id, name, slug, status, plan, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'active', ?4, ?5, ?6)",
        params![&id, &input.name, &input.slug, &plan, now, now],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::BadRequest("Slug already taken".into()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Organization {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        status: OrgStatus::Active,
        plan,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_organization_by_id(conn: &Connection, id: &str) -> Result<Option<Organization>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM organizations WHERE id = ?1",
            ORGANIZATION_COLS
        ),
        params![id],
    )
}

pub fn list_organizations_paginated(
    conn: &Connection,
    _access: &Unscoped,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Organization>, i64)> {
    let total: i64 =
        conn.query_row("SELECT COUNT(*) FROM organizations", [], |row| row.get(0))?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM organizations ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            ORGANIZATION_COLS
        ),
        params![limit, offset],
    )?;
    Ok((items, total))
}

pub fn set_organization_status(conn: &Connection, id: &str, status: OrgStatus) -> Result<bool> {
    UpdateBuilder::new("organizations", id)
        .with_updated_at()
        .set("status", status.as_ref().to_string())
        .execute(conn)
}

pub fn set_organization_plan(conn: &Connection, id: &str, plan: &str) -> Result<bool> {
    UpdateBuilder::new("organizations", id)
        .with_updated_at()
        .set("plan", plan.to_string())
        .execute(conn)
}

// ============ Memberships ============

pub fn create_membership(
    conn: &Connection,
    org_id: &str,
    input: &CreateMembership,
) -> Result<Membership> {
    let id = gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO memberships (id, org_id, user_id, role, functional_role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            org_id,
            &input.user_id,
            input.role.as_ref(),
            input.functional_role.as_ref(),
            now
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::BadRequest(
                "User is already a member of this organization".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Membership {
        id,
        org_id: org_id.to_string(),
        user_id: input.user_id.clone(),
        role: input.role,
        functional_role: input.functional_role,
        created_at: now,
    })
}

pub fn get_membership(
    conn: &Connection,
    user_id: &str,
    org_id: &str,
) -> Result<Option<Membership>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM memberships WHERE user_id = ?1 AND org_id = ?2",
            MEMBERSHIP_COLS
        ),
        params![user_id, org_id],
    )
}

pub fn get_membership_by_id(conn: &Connection, id: &str) -> Result<Option<Membership>> {
    query_one(
        conn,
        &format!("SELECT {} FROM memberships WHERE id = ?1", MEMBERSHIP_COLS),
        params![id],
    )
}

/// All memberships for a user, with organization details joined.
pub fn list_memberships_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<MembershipWithOrg>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM memberships m JOIN organizations o ON o.id = m.org_id
             WHERE m.user_id = ?1 ORDER BY o.name",
            MEMBERSHIP_WITH_ORG_COLS
        ),
        params![user_id],
    )
}

pub fn list_members_for_org_paginated(
    conn: &Connection,
    org_id: &str,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Membership>, i64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memberships WHERE org_id = ?1",
        params![org_id],
        |row| row.get(0),
    )?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM memberships WHERE org_id = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            MEMBERSHIP_COLS
        ),
        params![org_id, limit, offset],
    )?;
    Ok((items, total))
}

pub fn update_membership(conn: &Connection, id: &str, input: &UpdateMembership) -> Result<bool> {
    UpdateBuilder::new("memberships", id)
        .set_opt("role", input.role.map(|r| r.as_ref().to_string()))
        .set_opt(
            "functional_role",
            input.functional_role.map(|r| r.as_ref().to_string()),
        )
        .execute(conn)
}

pub fn delete_membership(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM memberships WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn delete_memberships_for_user(conn: &Connection, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM memberships WHERE user_id = ?1",
        params![user_id],
    )?)
}

// ============ Sessions ============

/// Insert a session row. A token-hash collision is a fatal generation error,
/// surfaced to the caller instead of silently retried.
pub fn insert_session(
    conn: &Connection,
    user_id: &str,
    token_hash: &str,
    expires_at: i64,
    client: &ClientInfo,
) -> Result<Session> {
    let id = gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO sessions (id, user_id, token_hash, created_at, last_active_at, expires_at, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            user_id,
            token_hash,
            now,
            now,
            expires_at,
            &client.ip_address,
            &client.user_agent
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Internal("session token collision".into()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Session {
        id,
        user_id: user_id.to_string(),
        token_hash: token_hash.to_string(),
        created_at: now,
        last_active_at: now,
        expires_at,
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
    })
}

pub fn get_session_by_token_hash(conn: &Connection, token_hash: &str) -> Result<Option<Session>> {
    query_one(
        conn,
        &format!("SELECT {} FROM sessions WHERE token_hash = ?1", SESSION_COLS),
        params![token_hash],
    )
}

pub fn touch_session(conn: &Connection, id: &str, at: i64) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET last_active_at = ?1 WHERE id = ?2",
        params![at, id],
    )?;
    Ok(())
}

pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn delete_session_by_token_hash(conn: &Connection, token_hash: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(deleted > 0)
}

/// Single-statement delete: once this returns, no subsequent validate can
/// observe any of the user's sessions.
pub fn delete_sessions_for_user(conn: &Connection, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM sessions WHERE user_id = ?1",
        params![user_id],
    )?)
}

// ============ Platform admins ============

pub fn insert_platform_admin(
    conn: &Connection,
    user: &User,
    role: PlatformAdminRole,
    granted_by: Option<&str>,
) -> Result<PlatformAdmin> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO platform_admins (id, user_id, email, role, granted_by, created_at, revoked_at, revoked_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL)",
        params![&id, &user.id, &user.email, role.as_ref(), granted_by, now],
    )?;

    Ok(PlatformAdmin {
        id,
        user_id: user.id.clone(),
        email: user.email.clone(),
        role,
        granted_by: granted_by.map(String::from),
        created_at: now,
        revoked_at: None,
        revoked_by: None,
    })
}

pub fn get_platform_admin_by_id(conn: &Connection, id: &str) -> Result<Option<PlatformAdmin>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM platform_admins WHERE id = ?1",
            PLATFORM_ADMIN_COLS
        ),
        params![id],
    )
}

/// The primary grant source: a non-revoked row for this user.
pub fn get_active_admin_by_user_id(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<PlatformAdmin>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM platform_admins WHERE user_id = ?1 AND revoked_at IS NULL",
            PLATFORM_ADMIN_COLS
        ),
        params![user_id],
    )
}

pub fn list_platform_admins_paginated(
    conn: &Connection,
    _access: &Unscoped,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PlatformAdmin>, i64)> {
    let total: i64 =
        conn.query_row("SELECT COUNT(*) FROM platform_admins", [], |row| row.get(0))?;
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM platform_admins ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            PLATFORM_ADMIN_COLS
        ),
        params![limit, offset],
    )?;
    Ok((items, total))
}

/// Stamp the revocation; effective for all subsequent lookups immediately.
pub fn revoke_platform_admin_row(
    conn: &Connection,
    id: &str,
    revoked_by: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE platform_admins SET revoked_at = ?1, revoked_by = ?2 WHERE id = ?3 AND revoked_at IS NULL",
        params![now(), revoked_by, id],
    )?;
    Ok(affected > 0)
}

pub fn delete_platform_admins_for_user(conn: &Connection, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM platform_admins WHERE user_id = ?1",
        params![user_id],
    )?)
}

// ============ OTP codes ============

pub fn insert_otp(
    conn: &Connection,
    user_id: &str,
    code_hash: &str,
    expires_at: i64,
) -> Result<OtpCode> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO otp_codes (id, user_id, code_hash, expires_at, consumed_at, created_at)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
        params![&id, user_id, code_hash, expires_at, now],
    )?;

    Ok(OtpCode {
        id,
        user_id: user_id.to_string(),
        code_hash: code_hash.to_string(),
        expires_at,
        consumed_at: None,
        created_at: now,
    })
}

pub fn get_latest_otp_for_user(conn: &Connection, user_id: &str) -> Result<Option<OtpCode>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM otp_codes WHERE user_id = ?1 AND consumed_at IS NULL
             ORDER BY created_at DESC LIMIT 1",
            OTP_CODE_COLS
        ),
        params![user_id],
    )
}

pub fn consume_otp(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE otp_codes SET consumed_at = ?1 WHERE id = ?2 AND consumed_at IS NULL",
        params![now(), id],
    )?;
    Ok(affected > 0)
}

pub fn delete_otps_for_user(conn: &Connection, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM otp_codes WHERE user_id = ?1",
        params![user_id],
    )?)
}

// ============ Forecasts (tenant-owned) ============

/// Create a forecast. The organization comes from the scoped write wrapper,
/// never from the payload.
pub fn create_forecast(
    conn: &Connection,
    write: &ScopedWrite<CreateForecast>,
    created_by: &str,
) -> Result<Forecast> {
    let id = gen_id();
    let now = now();
    let input = &write.payload;

    conn.execute(
        "INSERT INTO forecasts (id, org_id, name, period, quantity, status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?7, ?8)",
        params![
            &id,
            write.org_id(),
            &input.name,
            &input.period,
            input.quantity,
            created_by,
            now,
            now
        ],
    )?;

    Ok(Forecast {
        id,
        org_id: write.org_id().to_string(),
        name: input.name.clone(),
        period: input.period.clone(),
        quantity: input.quantity,
        status: ForecastStatus::Draft,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Point lookup, scoped: the organization predicate is part of the WHERE
/// clause, so a foreign id resolves to "not found" rather than leaking.
pub fn get_forecast(
    conn: &Connection,
    scope: &ScopeGuard,
    id: &str,
) -> Result<Option<Forecast>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM forecasts WHERE id = ?1 AND org_id = ?2",
            FORECAST_COLS
        ),
        params![id, scope.org_id()],
    )
}

pub fn list_forecasts(
    conn: &Connection,
    scoped: &Scoped<ForecastFilter>,
) -> Result<(Vec<Forecast>, i64)> {
    let mut where_clause = String::from("WHERE org_id = ?");
    let mut filter_params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(scoped.org_id().to_string())];

    if let Some(status) = scoped.filter.status {
        where_clause.push_str(" AND status = ?");
        filter_params.push(Box::new(status.as_ref().to_string()));
    }
    if let Some(ref period) = scoped.filter.period {
        where_clause.push_str(" AND period = ?");
        filter_params.push(Box::new(period.clone()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM forecasts {}", where_clause);
    let filter_refs: Vec<&dyn rusqlite::ToSql> =
        filter_params.iter().map(|b| b.as_ref()).collect();
    let total: i64 = conn.query_row(&count_sql, filter_refs.as_slice(), |row| row.get(0))?;

    let select_sql = format!(
        "SELECT {} FROM forecasts {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        FORECAST_COLS, where_clause
    );
    filter_params.push(Box::new(scoped.filter.pagination.limit()));
    filter_params.push(Box::new(scoped.filter.pagination.offset()));
    let select_refs: Vec<&dyn rusqlite::ToSql> =
        filter_params.iter().map(|b| b.as_ref()).collect();

    let items = query_all(conn, &select_sql, select_refs.as_slice())?;
    Ok((items, total))
}

pub fn update_forecast(
    conn: &Connection,
    scope: &ScopeGuard,
    id: &str,
    input: &UpdateForecast,
) -> Result<bool> {
    // The org predicate rides in the WHERE clause; an id from another tenant
    // updates zero rows.
    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ref name) = input.name {
        sets.push("name = ?".into());
        values.push(name.clone().into());
    }
    if let Some(ref period) = input.period {
        sets.push("period = ?".into());
        values.push(period.clone().into());
    }
    if let Some(quantity) = input.quantity {
        sets.push("quantity = ?".into());
        values.push(quantity.into());
    }
    if let Some(status) = input.status {
        sets.push("status = ?".into());
        values.push(status.as_ref().to_string().into());
    }
    if sets.is_empty() {
        return Ok(false);
    }
    sets.push("updated_at = ?".into());
    values.push(now().into());
    values.push(id.to_string().into());
    values.push(scope.org_id().to_string().into());

    let sql = format!(
        "UPDATE forecasts SET {} WHERE id = ? AND org_id = ?",
        sets.join(", ")
    );
    let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(affected > 0)
}

pub fn delete_forecast(
    conn: &Connection,
    scope: &ScopeGuard,
    id: &str,
) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM forecasts WHERE id = ?1 AND org_id = ?2",
        params![id, scope.org_id()],
    )?;
    Ok(deleted > 0)
}
