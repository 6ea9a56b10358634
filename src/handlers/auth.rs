use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::audit::ActivityEntry;
use crate::auth::{self, AuthContext, ContextProfile};
use crate::crypto::hash_password;
use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{ClientInfo, RegisterUser, User};
use crate::util::{SESSION_COOKIE, extract_session_token};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token; also set as an HttpOnly cookie.
    pub token: String,
    pub expires_at: i64,
    pub user: User,
}

fn session_cookie(state: &AppState, token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!state.config.dev_mode)
        .build()
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterUser>,
) -> Result<Json<User>> {
    input.validate()?;
    let password_hash = hash_password(&input.password)?;

    let conn = state.db.get()?;
    let user = queries::create_user(&conn, &input.email, &input.name, &password_hash)?;

    let client = ClientInfo::from_headers(&headers);
    state.audit.record_activity(&ActivityEntry {
        actor_id: &user.id,
        actor_email: &user.email,
        action: "user.register",
        target_type: "user",
        target_id: &user.id,
        org_id: None,
        details: None,
        client: &client,
    });

    Ok(Json(user))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let conn = state.db.get()?;
    let user = auth::verify::verify_password_login(&conn, &input.email, &input.password)?;

    let client = ClientInfo::from_headers(&headers);
    let (session, token) = auth::session::create_session(&conn, &state.config, &user.id, &client)?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &user.id,
        actor_email: &user.email,
        action: "session.login",
        target_type: "session",
        target_id: &session.id,
        org_id: None,
        details: None,
        client: &client,
    });

    let jar = jar.add(session_cookie(&state, &token));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

/// Request a one-time sign-in code by email. Responds identically whether
/// or not the address has an account.
pub async fn request_code(
    State(state): State<AppState>,
    Json(input): Json<RequestCodeRequest>,
) -> Result<Json<serde_json::Value>> {
    auth::verify::issue_otp(&state, &input.email)?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(input): Json<VerifyCodeRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let conn = state.db.get()?;
    let user = auth::verify::verify_otp(&conn, &input.email, &input.code)?;

    let client = ClientInfo::from_headers(&headers);
    let (session, token) = auth::session::create_session(&conn, &state.config, &user.id, &client)?;

    state.audit.record_activity(&ActivityEntry {
        actor_id: &user.id,
        actor_email: &user.email,
        action: "session.login_otp",
        target_type: "session",
        target_id: &session.id,
        org_id: None,
        details: None,
        client: &client,
    });

    let jar = jar.add(session_cookie(&state, &token));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(token) = extract_session_token(&headers) {
        let conn = state.db.get()?;
        auth::session::revoke_session(&conn, &token)?;
    }
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    Ok((jar, Json(serde_json::json!({ "revoked": true }))))
}

/// Revoke every session the caller holds, including the current one.
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    let conn = state.db.get()?;
    let revoked = auth::session::revoke_all_sessions(&conn, &ctx.user.id)?;
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    Ok((jar, Json(serde_json::json!({ "revoked": revoked }))))
}

pub async fn me(Extension(ctx): Extension<AuthContext>) -> Result<Json<ContextProfile>> {
    Ok(Json(ctx.profile()))
}
