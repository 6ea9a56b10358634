//! Platform-admin authority: grant resolution, grant management, and the
//! privileged user/organization operations that ride on it.
//!
//! Every mutation here records a must-succeed admin action. The record is
//! written before the primary-database transaction commits, so a failed
//! audit write rolls the operation back.

use rusqlite::Connection;

use crate::audit::AdminActionEntry;
use crate::config::Config;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::{
    AdminGrant, GrantPlatformAdmin, OrgStatus, Organization, PlatformAdmin, PlatformAdminRole,
    User,
};

use super::context::AuthContext;

/// Resolve a user's platform-admin authority.
///
/// A grant row is authoritative when present. The bootstrap allow-list is a
/// fallback for first-run setups; it applies only to active, verified
/// accounts and is never persisted.
pub fn effective_admin(
    conn: &Connection,
    config: &Config,
    user: &User,
) -> Result<Option<AdminGrant>> {
    if let Some(row) = queries::get_active_admin_by_user_id(conn, &user.id)? {
        return Ok(Some(AdminGrant::Granted {
            id: row.id,
            role: row.role,
        }));
    }
    if user.active && user.email_verified && config.is_bootstrap_admin(&user.email) {
        return Ok(Some(AdminGrant::Bootstrap {
            email: user.email.clone(),
        }));
    }
    Ok(None)
}

pub fn require_admin(ctx: &AuthContext) -> Result<&AdminGrant> {
    ctx.admin.as_ref().ok_or(AppError::Forbidden)
}

pub fn require_super_admin(ctx: &AuthContext) -> Result<&AdminGrant> {
    let grant = require_admin(ctx)?;
    if grant.role() != PlatformAdminRole::SuperAdmin {
        return Err(AppError::Forbidden);
    }
    Ok(grant)
}

/// Grant platform-admin authority to a user. Super-admin only.
pub fn grant_platform_admin(
    state: &AppState,
    ctx: &AuthContext,
    input: &GrantPlatformAdmin,
) -> Result<PlatformAdmin> {
    let grant = require_super_admin(ctx)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let target = queries::get_user_by_id(&tx, &input.user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if queries::get_active_admin_by_user_id(&tx, &target.id)?.is_some() {
        return Err(AppError::InvalidTransition(
            "user already holds an active platform-admin grant".into(),
        ));
    }

    let admin = queries::insert_platform_admin(&tx, &target, input.role, Some(&ctx.user.id))?;

    let after = serde_json::to_value(&admin)?;
    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "admin.grant",
        target_type: "user",
        target_id: &target.id,
        before: None,
        after: Some(&after),
        reason: None,
        org_id: None,
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(admin)
}

/// Revoke a grant. Super-admin only; effective on the target's next request.
/// Bootstrap authority has no row and cannot be revoked here, only by
/// editing the allow-list.
pub fn revoke_platform_admin(
    state: &AppState,
    ctx: &AuthContext,
    grant_id: &str,
    reason: Option<&str>,
) -> Result<PlatformAdmin> {
    let grant = require_super_admin(ctx)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let row = queries::get_platform_admin_by_id(&tx, grant_id)?
        .ok_or_else(|| AppError::NotFound("Grant not found".into()))?;
    if row.is_revoked() {
        return Err(AppError::InvalidTransition(
            "grant is already revoked".into(),
        ));
    }

    let before = serde_json::to_value(&row)?;
    queries::revoke_platform_admin_row(&tx, &row.id, &ctx.user.id)?;
    let revoked = queries::get_platform_admin_by_id(&tx, &row.id)?
        .ok_or_else(|| AppError::Internal("grant row vanished during revoke".into()))?;
    let after = serde_json::to_value(&revoked)?;

    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "admin.revoke",
        target_type: "user",
        target_id: &row.user_id,
        before: Some(&before),
        after: Some(&after),
        reason,
        org_id: None,
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(revoked)
}

/// Disable a user account and revoke all of its sessions.
pub fn disable_user(
    state: &AppState,
    ctx: &AuthContext,
    user_id: &str,
    reason: Option<&str>,
) -> Result<User> {
    let grant = require_admin(ctx)?;
    if user_id == ctx.user.id {
        return Err(AppError::InvalidTransition(
            "cannot disable your own account".into(),
        ));
    }

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let target = queries::get_user_by_id(&tx, user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if !target.active {
        return Err(AppError::InvalidTransition(
            "account is already disabled".into(),
        ));
    }

    let before = serde_json::to_value(&target)?;
    queries::set_user_active(&tx, user_id, false)?;
    queries::delete_sessions_for_user(&tx, user_id)?;
    let disabled = queries::get_user_by_id(&tx, user_id)?
        .ok_or_else(|| AppError::Internal("user row vanished during disable".into()))?;
    let after = serde_json::to_value(&disabled)?;

    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "user.disable",
        target_type: "user",
        target_id: user_id,
        before: Some(&before),
        after: Some(&after),
        reason,
        org_id: None,
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(disabled)
}

/// Re-enable a disabled account. Sessions are not restored.
pub fn enable_user(
    state: &AppState,
    ctx: &AuthContext,
    user_id: &str,
    reason: Option<&str>,
) -> Result<User> {
    let grant = require_admin(ctx)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let target = queries::get_user_by_id(&tx, user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if target.active {
        return Err(AppError::InvalidTransition(
            "account is already active".into(),
        ));
    }

    let before = serde_json::to_value(&target)?;
    queries::set_user_active(&tx, user_id, true)?;
    let enabled = queries::get_user_by_id(&tx, user_id)?
        .ok_or_else(|| AppError::Internal("user row vanished during enable".into()))?;
    let after = serde_json::to_value(&enabled)?;

    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "user.enable",
        target_type: "user",
        target_id: user_id,
        before: Some(&before),
        after: Some(&after),
        reason,
        org_id: None,
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(enabled)
}

/// Permanently delete a user account.
///
/// Ordering is deliberate: the deletion is recorded (with a final snapshot)
/// before anything is removed, then the target's audit trails are purged,
/// then the primary rows go in one transaction. If the initial record fails,
/// nothing has changed.
pub fn delete_user(
    state: &AppState,
    ctx: &AuthContext,
    user_id: &str,
    reason: Option<&str>,
) -> Result<()> {
    let grant = require_super_admin(ctx)?;
    if user_id == ctx.user.id {
        return Err(AppError::InvalidTransition(
            "cannot delete your own account".into(),
        ));
    }

    let mut conn = state.db.get()?;

    let target = queries::get_user_by_id(&conn, user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let before = serde_json::to_value(&target)?;

    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "user.delete",
        target_type: "user",
        target_id: user_id,
        before: Some(&before),
        after: None,
        reason,
        org_id: None,
        client: &ctx.client,
    })?;

    state.audit.purge_actor_trails(user_id)?;

    let tx = conn.transaction()?;
    queries::delete_sessions_for_user(&tx, user_id)?;
    queries::delete_otps_for_user(&tx, user_id)?;
    queries::delete_memberships_for_user(&tx, user_id)?;
    queries::delete_platform_admins_for_user(&tx, user_id)?;
    queries::delete_user_row(&tx, user_id)?;
    tx.commit()?;

    Ok(())
}

/// Suspend an organization. Members lose access on their next request.
pub fn set_organization_status(
    state: &AppState,
    ctx: &AuthContext,
    org_id: &str,
    status: OrgStatus,
    reason: Option<&str>,
) -> Result<Organization> {
    let grant = require_admin(ctx)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let org = queries::get_organization_by_id(&tx, org_id)?.ok_or(AppError::OrgNotFound)?;
    if org.status == status {
        return Err(AppError::InvalidTransition(format!(
            "organization is already {}",
            status.as_ref()
        )));
    }

    let before = serde_json::to_value(&org)?;
    queries::set_organization_status(&tx, org_id, status)?;
    let updated = queries::get_organization_by_id(&tx, org_id)?
        .ok_or_else(|| AppError::Internal("organization row vanished during update".into()))?;
    let after = serde_json::to_value(&updated)?;

    let action = match status {
        OrgStatus::Suspended => "org.suspend",
        OrgStatus::Active => "org.reactivate",
    };
    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action,
        target_type: "organization",
        target_id: org_id,
        before: Some(&before),
        after: Some(&after),
        reason,
        org_id: Some(org_id),
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(updated)
}

/// Change an organization's plan, with before/after snapshots.
pub fn set_organization_plan(
    state: &AppState,
    ctx: &AuthContext,
    org_id: &str,
    plan: &str,
    reason: Option<&str>,
) -> Result<Organization> {
    let grant = require_admin(ctx)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let org = queries::get_organization_by_id(&tx, org_id)?.ok_or(AppError::OrgNotFound)?;
    let before = serde_json::to_value(&org)?;
    queries::set_organization_plan(&tx, org_id, plan)?;
    let updated = queries::get_organization_by_id(&tx, org_id)?
        .ok_or_else(|| AppError::Internal("organization row vanished during update".into()))?;
    let after = serde_json::to_value(&updated)?;

    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: Some(grant.source()),
        action: "org.plan_change",
        target_type: "organization",
        target_id: org_id,
        before: Some(&before),
        after: Some(&after),
        reason,
        org_id: Some(org_id),
        client: &ctx.client,
    })?;

    tx.commit()?;
    Ok(updated)
}
