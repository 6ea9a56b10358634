use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::auth::{self, AuthContext, require_admin};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{OrgStatus, Organization, UpdateOrganizationPlan};
use crate::pagination::{Paginated, PaginationQuery};
use crate::tenancy::Unscoped;

#[derive(Debug, Default, Deserialize)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

/// Cross-tenant organization listing. The unscoped token makes the
/// privileged read explicit.
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<Organization>>> {
    let access = Unscoped::for_admin(require_admin(&ctx)?);
    let conn = state.db.get()?;
    let (items, total) = queries::list_organizations_paginated(
        &conn,
        &access,
        pagination.limit(),
        pagination.offset(),
    )?;
    Ok(Json(Paginated::new(
        items,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Organization>> {
    let conn = state.db.get()?;
    let org = queries::get_organization_by_id(&conn, &id)?.ok_or(AppError::OrgNotFound)?;
    Ok(Json(org))
}

pub async fn suspend_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<Organization>> {
    let org = auth::admin::set_organization_status(
        &state,
        &ctx,
        &id,
        OrgStatus::Suspended,
        body.reason.as_deref(),
    )?;
    Ok(Json(org))
}

pub async fn reactivate_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<Organization>> {
    let org = auth::admin::set_organization_status(
        &state,
        &ctx,
        &id,
        OrgStatus::Active,
        body.reason.as_deref(),
    )?;
    Ok(Json(org))
}

pub async fn change_organization_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateOrganizationPlan>,
) -> Result<Json<Organization>> {
    let org = auth::admin::set_organization_plan(
        &state,
        &ctx,
        &id,
        &body.plan,
        body.reason.as_deref(),
    )?;
    Ok(Json(org))
}
