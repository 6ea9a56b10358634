use axum::extract::{Extension, State};

use crate::auth::{self, AuthContext, require_admin};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::User;
use crate::pagination::{Paginated, PaginationQuery};
use crate::tenancy::Unscoped;

use super::organizations::ReasonBody;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<User>>> {
    let access = Unscoped::for_admin(require_admin(&ctx)?);
    let conn = state.db.get()?;
    let (items, total) =
        queries::list_users_paginated(&conn, &access, pagination.limit(), pagination.offset())?;
    Ok(Json(Paginated::new(
        items,
        total,
        pagination.limit(),
        pagination.offset(),
    )))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

pub async fn disable_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<User>> {
    let user = auth::admin::disable_user(&state, &ctx, &id, body.reason.as_deref())?;
    Ok(Json(user))
}

pub async fn enable_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<User>> {
    let user = auth::admin::enable_user(&state, &ctx, &id, body.reason.as_deref())?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    auth::admin::delete_user(&state, &ctx, &id, None)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
