use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{build_context, require_admin};
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::models::ClientInfo;
use crate::util::extract_session_token;

/// Session auth plus a platform-admin requirement. The resolved context is
/// inserted for handlers; authority was checked against live grant state.
pub async fn platform_admin_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token =
        extract_session_token(request.headers()).ok_or(AppError::Unauthenticated)?;
    let client = ClientInfo::from_headers(request.headers());
    let conn = state.db.get()?;
    let ctx = build_context(&conn, &state.config, &token, client)?;
    require_admin(&ctx)?;
    drop(conn);

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
