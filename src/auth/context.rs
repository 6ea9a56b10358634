//! Per-request authorization context.
//!
//! Everything downstream authorization consults is resolved here, once,
//! against current database state. Nothing is cached across requests, so
//! revocations and membership changes take effect on the next request.

use rusqlite::Connection;
use serde::Serialize;

use crate::config::Config;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{
    AdminGrant, ClientInfo, FunctionalRole, Membership, MembershipRole, Organization, Session,
    User,
};

use super::admin::effective_admin;
use super::session::validate_session;

/// Fully resolved authority for one request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session: Session,
    /// The organization the user is currently operating in, if any.
    pub active_org: Option<Organization>,
    /// Membership in the active organization. None under admin override.
    pub membership: Option<Membership>,
    /// Platform-admin authority, from a grant row or the bootstrap list.
    pub admin: Option<AdminGrant>,
    /// True when the active organization is reachable only through
    /// platform-admin authority, not membership.
    pub admin_override: bool,
    pub client: ClientInfo,
}

impl AuthContext {
    pub fn active_org_id(&self) -> Option<&str> {
        self.active_org.as_ref().map(|o| o.id.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.admin.is_some()
    }

    /// Organization-level role. Admin override grants read-only standing,
    /// so no management role is reported for it.
    pub fn role(&self) -> Option<MembershipRole> {
        self.membership.as_ref().map(|m| m.role)
    }

    /// Capability role within the active organization. Overriding admins
    /// observe as viewers.
    pub fn functional_role(&self) -> Option<FunctionalRole> {
        if self.admin_override {
            return Some(FunctionalRole::Viewer);
        }
        self.membership.as_ref().map(|m| m.functional_role)
    }

    pub fn can_write(&self) -> bool {
        self.functional_role().is_some_and(|r| r.can_write())
    }

    pub fn can_commit(&self) -> bool {
        self.functional_role().is_some_and(|r| r.can_commit())
    }

    pub fn can_manage_members(&self) -> bool {
        self.role().is_some_and(|r| r.can_manage_members())
    }

    pub fn profile(&self) -> ContextProfile {
        ContextProfile {
            user: self.user.clone(),
            active_org: self.active_org.clone(),
            role: self.role(),
            functional_role: self.functional_role(),
            admin: self.admin.clone(),
            admin_override: self.admin_override,
        }
    }
}

/// Serializable view of the context, returned by the `/me` endpoint.
#[derive(Debug, Serialize)]
pub struct ContextProfile {
    pub user: User,
    pub active_org: Option<Organization>,
    pub role: Option<MembershipRole>,
    pub functional_role: Option<FunctionalRole>,
    pub admin: Option<AdminGrant>,
    pub admin_override: bool,
}

/// Build the authorization context for a presented session token.
///
/// Order matters: the session must validate before anything else is
/// consulted, and the active-organization pointer is checked against live
/// membership and organization state on every call.
pub fn build_context(
    conn: &Connection,
    config: &Config,
    token: &str,
    client: ClientInfo,
) -> Result<AuthContext> {
    let (session, user) = validate_session(conn, token)?;
    let admin = effective_admin(conn, config, &user)?;

    let (active_org, membership, admin_override) = match user.active_org_id.as_deref() {
        None => (None, None, false),
        Some(org_id) => {
            let membership = queries::get_membership(conn, &user.id, org_id)?;
            let org = queries::get_organization_by_id(conn, org_id)?;

            match (membership, org) {
                // Suspension is not checked here: the context must still
                // resolve so the user can switch away. Tenant-data access
                // rejects suspended organizations at scoping time.
                (Some(membership), Some(org)) => (Some(org), Some(membership), false),
                // The pointer names an organization the user no longer
                // belongs to. Admin authority can stand in; otherwise the
                // pointer is stale and the request fails until a switch
                // repairs it.
                (None, Some(org)) => match admin {
                    Some(_) => (Some(org), None, true),
                    None => return Err(AppError::OrphanedActiveOrg),
                },
                // The pointed-to organization row is gone entirely.
                (_, None) => return Err(AppError::OrgNotFound),
            }
        }
    };

    Ok(AuthContext {
        user,
        session,
        active_org,
        membership,
        admin,
        admin_override,
        client,
    })
}
