use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::audit::ActivityEntry;
use crate::auth::{self, AuthContext, SwitchResult};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{
    CreateMembership, CreateOrganization, FunctionalRole, Membership, MembershipRole,
    MembershipWithOrg, Organization, UpdateMembership,
};
use crate::pagination::{Paginated, PaginationQuery};

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub org_id: String,
}

/// Create an organization. The creator becomes its owner; switching into it
/// is a separate, audited step.
pub async fn create_org(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateOrganization>,
) -> Result<Json<Organization>> {
    input.validate()?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let org = queries::create_organization(&tx, &input)?;
    queries::create_membership(
        &tx,
        &org.id,
        &CreateMembership {
            user_id: ctx.user.id.clone(),
            role: MembershipRole::Owner,
            functional_role: FunctionalRole::Approver,
        },
    )?;
    tx.commit()?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "org.create",
        target_type: "organization",
        target_id: &org.id,
        org_id: Some(&org.id),
        details: None,
        client: &ctx.client,
    });

    Ok(Json(org))
}

/// The caller's memberships, with organization details for the picker.
pub async fn list_my_orgs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<MembershipWithOrg>>> {
    let conn = state.db.get()?;
    let memberships = queries::list_memberships_for_user(&conn, &ctx.user.id)?;
    Ok(Json(memberships))
}

pub async fn switch_org(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<SwitchRequest>,
) -> Result<Json<SwitchResult>> {
    let result = auth::switch_organization(&state, &ctx, &input.org_id)?;
    Ok(Json(result))
}

/// Drop out of the current organization context without picking a new one.
/// The recovery path for an orphaned pointer.
pub async fn clear_active_org(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<serde_json::Value>> {
    auth::switch::clear_active_org(&state, &ctx)?;
    Ok(Json(serde_json::json!({ "cleared": true })))
}

fn require_member_management(ctx: &AuthContext) -> Result<&str> {
    if ctx.admin_override || !ctx.can_manage_members() {
        return Err(AppError::Forbidden);
    }
    ctx.active_org_id().ok_or(AppError::Forbidden)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<Membership>>> {
    // Any member of the active org may see its roster.
    if ctx.membership.is_none() && !ctx.admin_override {
        return Err(AppError::Forbidden);
    }
    let org_id = ctx.active_org_id().ok_or(AppError::Forbidden)?;

    let conn = state.db.get()?;
    let (items, total) =
        queries::list_members_for_org_paginated(&conn, org_id, pagination.limit(), pagination.offset())?;
    Ok(Json(Paginated::new(
        items,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateMembership>,
) -> Result<Json<Membership>> {
    let org_id = require_member_management(&ctx)?.to_string();

    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &input.user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let membership = queries::create_membership(&conn, &org_id, &input)?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "member.add",
        target_type: "membership",
        target_id: &membership.id,
        org_id: Some(&org_id),
        details: Some(&serde_json::json!({
            "user_id": user.id,
            "role": membership.role,
            "functional_role": membership.functional_role,
        })),
        client: &ctx.client,
    });

    Ok(Json(membership))
}

pub async fn update_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateMembership>,
) -> Result<Json<Membership>> {
    let org_id = require_member_management(&ctx)?.to_string();

    let conn = state.db.get()?;
    let existing = queries::get_membership_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Membership not found".into()))?;
    if existing.org_id != org_id {
        return Err(AppError::NotFound("Membership not found".into()));
    }

    queries::update_membership(&conn, &id, &input)?;
    let updated = queries::get_membership_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Membership not found".into()))?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "member.update",
        target_type: "membership",
        target_id: &id,
        org_id: Some(&org_id),
        details: Some(&serde_json::json!({
            "role": updated.role,
            "functional_role": updated.functional_role,
        })),
        client: &ctx.client,
    });

    Ok(Json(updated))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let org_id = require_member_management(&ctx)?.to_string();

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let existing = queries::get_membership_by_id(&tx, &id)?
        .ok_or_else(|| AppError::NotFound("Membership not found".into()))?;
    if existing.org_id != org_id {
        return Err(AppError::NotFound("Membership not found".into()));
    }

    // The membership and any stale pointer to it go together; a removed
    // member must not keep operating in this org.
    queries::delete_membership(&tx, &id)?;
    auth::switch::detach_user_from_org(&tx, &existing.user_id, &org_id)?;
    tx.commit()?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "member.remove",
        target_type: "membership",
        target_id: &id,
        org_id: Some(&org_id),
        details: Some(&serde_json::json!({ "user_id": existing.user_id })),
        client: &ctx.client,
    });

    Ok(Json(serde_json::json!({ "removed": true })))
}
