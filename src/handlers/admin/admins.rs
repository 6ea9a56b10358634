use axum::extract::{Extension, State};

use crate::auth::{self, AuthContext, require_admin};
use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Path, Query};
use crate::models::{GrantPlatformAdmin, PlatformAdmin, RevokePlatformAdmin};
use crate::pagination::{Paginated, PaginationQuery};
use crate::tenancy::Unscoped;

/// Grant history, revoked rows included. Bootstrap authority has no rows
/// here; it exists only in configuration.
pub async fn list_admins(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<PlatformAdmin>>> {
    let access = Unscoped::for_admin(require_admin(&ctx)?);
    let conn = state.db.get()?;
    let (items, total) = queries::list_platform_admins_paginated(
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

pub async fn grant_admin(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<GrantPlatformAdmin>,
) -> Result<Json<PlatformAdmin>> {
    let admin = auth::admin::grant_platform_admin(&state, &ctx, &input)?;
    Ok(Json(admin))
}

pub async fn revoke_admin(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<RevokePlatformAdmin>,
) -> Result<Json<PlatformAdmin>> {
    let admin =
        auth::admin::revoke_platform_admin(&state, &ctx, &id, body.reason.as_deref())?;
    Ok(Json(admin))
}
