use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthContext, build_context};
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::models::ClientInfo;
use crate::util::extract_session_token;

/// Authenticate the request's session token and resolve the full
/// authorization context for it.
fn authenticate(state: &AppState, request: &Request) -> Result<AuthContext> {
    let token =
        extract_session_token(request.headers()).ok_or(AppError::Unauthenticated)?;
    let client = ClientInfo::from_headers(request.headers());
    let conn = state.db.get()?;
    build_context(&conn, &state.config, &token, client)
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let ctx = authenticate(&state, &request)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
