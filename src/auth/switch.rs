//! Organization switch workflow.
//!
//! The active-organization pointer changes only here. The pointer update and
//! the audit record commit together: the record is written before the
//! primary transaction commits, and a failed record rolls the switch back.

use serde::Serialize;

use crate::audit::AdminActionEntry;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::{Membership, Organization};

use super::context::AuthContext;

#[derive(Debug, Serialize)]
pub struct SwitchResult {
    pub organization: Organization,
    pub membership: Option<Membership>,
    /// True when the switch succeeded on platform-admin authority rather
    /// than membership.
    pub admin_override: bool,
}

/// Switch the caller's active organization.
///
/// Members switch into active organizations they belong to. Platform admins
/// may enter organizations they are not members of; the record of such a
/// switch carries their grant source.
pub fn switch_organization(
    state: &AppState,
    ctx: &AuthContext,
    target_org_id: &str,
) -> Result<SwitchResult> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let org = queries::get_organization_by_id(&tx, target_org_id)?
        .ok_or(AppError::OrgNotFound)?;
    let membership = queries::get_membership(&tx, &ctx.user.id, target_org_id)?;

    let admin_override = match membership {
        Some(_) => false,
        None => {
            if ctx.admin.is_none() {
                return Err(AppError::NotMember);
            }
            true
        }
    };
    if !org.is_active() {
        return Err(AppError::OrgInactive);
    }

    queries::set_active_org(&tx, &ctx.user.id, Some(target_org_id))?;

    let details = serde_json::json!({
        "from_org": ctx.active_org_id(),
        "to_org": target_org_id,
        "admin_override": admin_override,
    });
    state.audit.record_admin_action(&AdminActionEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        grant_source: admin_override.then(|| ctx.admin.as_ref().map(|g| g.source())).flatten(),
        action: "org.switch",
        target_type: "organization",
        target_id: target_org_id,
        before: None,
        after: Some(&details),
        reason: None,
        org_id: Some(target_org_id),
        client: &ctx.client,
    })?;

    tx.commit()?;

    Ok(SwitchResult {
        organization: org,
        membership,
        admin_override,
    })
}

/// Clear the active-organization pointer. Used when the caller leaves or is
/// removed from their current organization.
pub fn clear_active_org(state: &AppState, ctx: &AuthContext) -> Result<()> {
    let conn = state.db.get()?;
    queries::set_active_org(&conn, &ctx.user.id, None)?;
    Ok(())
}

/// Clear another user's pointer if it references the given organization.
/// Called when a membership is removed, so the pointer never outlives it.
pub fn detach_user_from_org(
    conn: &rusqlite::Connection,
    user_id: &str,
    org_id: &str,
) -> Result<()> {
    if let Some(user) = queries::get_user_by_id(conn, user_id)? {
        if user.active_org_id.as_deref() == Some(org_id) {
            queries::set_active_org(conn, user_id, None)?;
        }
    }
    Ok(())
}
