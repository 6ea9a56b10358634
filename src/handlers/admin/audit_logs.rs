use axum::extract::{Extension, State};

use crate::auth::{AuthContext, require_admin};
use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::models::{ActivityEvent, AdminAction, AuditQuery};
use crate::pagination::Paginated;
use crate::tenancy::Unscoped;

pub async fn query_admin_actions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Paginated<AdminAction>>> {
    let access = Unscoped::for_admin(require_admin(&ctx)?);
    let (items, total) = state.audit.query_admin_actions(&access, &query)?;
    Ok(Json(Paginated::new(items, total, query.limit(), query.offset())))
}

pub async fn query_activity(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Paginated<ActivityEvent>>> {
    let access = Unscoped::for_admin(require_admin(&ctx)?);
    let (items, total) = state.audit.query_activity(&access, &query)?;
    Ok(Json(Paginated::new(items, total, query.limit(), query.offset())))
}
