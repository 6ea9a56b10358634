//! Session issuance, validation, and revocation.
//!
//! Sessions are bearer tokens handed to the client once; only a hash is
//! stored. Expiry is lazy: an expired row is deleted by the validate that
//! finds it, so no sweeper is needed for correctness.

use rusqlite::Connection;

use crate::config::Config;
use crate::crypto::{generate_session_token, hash_secret};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{ClientInfo, Session, User};

/// Sliding-activity writes are coalesced to at most one per session per
/// interval, so validation is read-only on hot paths.
pub const TOUCH_INTERVAL_SECS: i64 = 60;

/// Issue a new session for a user. Returns the session row and the plaintext
/// token, which is never stored and cannot be recovered later.
pub fn create_session(
    conn: &Connection,
    config: &Config,
    user_id: &str,
    client: &ClientInfo,
) -> Result<(Session, String)> {
    let token = generate_session_token();
    let token_hash = hash_secret(&token);
    let expires_at = queries::now() + config.session_ttl_hours * 3600;

    let session = queries::insert_session(conn, user_id, &token_hash, expires_at, client)?;
    Ok((session, token))
}

/// Resolve a presented token to a live session and its active user.
///
/// Fails closed: unknown token, expired session, missing user, and disabled
/// user are all the same `Unauthenticated` to the caller.
pub fn validate_session(conn: &Connection, token: &str) -> Result<(Session, User)> {
    let token_hash = hash_secret(token);
    let session = queries::get_session_by_token_hash(conn, &token_hash)?
        .ok_or(AppError::Unauthenticated)?;

    let now = queries::now();
    if session.expires_at <= now {
        // Lazy expiry: reap the row on the way out.
        queries::delete_session(conn, &session.id)?;
        return Err(AppError::Unauthenticated);
    }

    let user = queries::get_user_by_id(conn, &session.user_id)?
        .ok_or(AppError::Unauthenticated)?;
    if !user.active {
        return Err(AppError::Unauthenticated);
    }

    if now - session.last_active_at >= TOUCH_INTERVAL_SECS {
        queries::touch_session(conn, &session.id, now)?;
    }

    Ok((session, user))
}

/// Revoke the session behind a presented token. Succeeds even when the
/// token is unknown; logout is idempotent.
pub fn revoke_session(conn: &Connection, token: &str) -> Result<()> {
    let token_hash = hash_secret(token);
    queries::delete_session_by_token_hash(conn, &token_hash)?;
    Ok(())
}

/// Revoke every session a user holds. One statement, so a validate racing
/// this call either sees the old rows or none.
pub fn revoke_all_sessions(conn: &Connection, user_id: &str) -> Result<usize> {
    queries::delete_sessions_for_user(conn, user_id)
}
