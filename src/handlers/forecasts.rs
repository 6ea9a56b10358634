//! Tenant-owned forecast records. Every query here goes through the scope
//! guard; the organization id comes from the caller's context, never from
//! the request.

use axum::extract::{Extension, State};

use crate::audit::ActivityEntry;
use crate::auth::AuthContext;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{CreateForecast, Forecast, ForecastFilter, ForecastStatus, UpdateForecast};
use crate::pagination::Paginated;
use crate::tenancy::ScopeGuard;

pub async fn create_forecast(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateForecast>,
) -> Result<Json<Forecast>> {
    input.validate()?;
    if !ctx.can_write() {
        return Err(AppError::Forbidden);
    }

    let guard = ScopeGuard::from_context(&ctx)?;
    let write = guard.scope_write(input);

    let conn = state.db.get()?;
    let forecast = queries::create_forecast(&conn, &write, &ctx.user.id)?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "forecast.create",
        target_type: "forecast",
        target_id: &forecast.id,
        org_id: Some(guard.org_id()),
        details: None,
        client: &ctx.client,
    });

    Ok(Json(forecast))
}

pub async fn list_forecasts(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<ForecastFilter>,
) -> Result<Json<Paginated<Forecast>>> {
    let guard = ScopeGuard::from_context(&ctx)?;
    let scoped = guard.scope(filter);

    let conn = state.db.get()?;
    let (items, total) = queries::list_forecasts(&conn, &scoped)?;
    let limit = scoped.filter.pagination.limit();
    let offset = scoped.filter.pagination.offset();
    Ok(Json(Paginated::new(items, total, limit, offset)))
}

pub async fn get_forecast(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Forecast>> {
    let guard = ScopeGuard::from_context(&ctx)?;
    let conn = state.db.get()?;
    let forecast = queries::get_forecast(&conn, &guard, &id)?
        .ok_or_else(|| AppError::NotFound("Forecast not found".into()))?;
    Ok(Json(forecast))
}

pub async fn update_forecast(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateForecast>,
) -> Result<Json<Forecast>> {
    if !ctx.can_write() {
        return Err(AppError::Forbidden);
    }
    let guard = ScopeGuard::from_context(&ctx)?;
    let conn = state.db.get()?;

    let existing = queries::get_forecast(&conn, &guard, &id)?
        .ok_or_else(|| AppError::NotFound("Forecast not found".into()))?;
    if existing.status == ForecastStatus::Committed {
        return Err(AppError::InvalidTransition(
            "committed forecasts are immutable".into(),
        ));
    }
    if input.status == Some(ForecastStatus::Committed) && !ctx.can_commit() {
        return Err(AppError::Forbidden);
    }

    queries::update_forecast(&conn, &guard, &id, &input)?;
    let updated = queries::get_forecast(&conn, &guard, &id)?
        .ok_or_else(|| AppError::NotFound("Forecast not found".into()))?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "forecast.update",
        target_type: "forecast",
        target_id: &id,
        org_id: Some(guard.org_id()),
        details: Some(&serde_json::json!({ "status": updated.status })),
        client: &ctx.client,
    });

    Ok(Json(updated))
}

pub async fn delete_forecast(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    if !ctx.can_write() {
        return Err(AppError::Forbidden);
    }
    let guard = ScopeGuard::from_context(&ctx)?;
    let conn = state.db.get()?;

    let existing = queries::get_forecast(&conn, &guard, &id)?
        .ok_or_else(|| AppError::NotFound("Forecast not found".into()))?;
    if existing.status == ForecastStatus::Committed {
        return Err(AppError::InvalidTransition(
            "committed forecasts cannot be deleted".into(),
        ));
    }

    queries::delete_forecast(&conn, &guard, &id)?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &ctx.user.id,
        actor_email: &ctx.user.email,
        action: "forecast.delete",
        target_type: "forecast",
        target_id: &id,
        org_id: Some(guard.org_id()),
        details: None,
        client: &ctx.client,
    });

    Ok(Json(serde_json::json!({ "deleted": true })))
}
