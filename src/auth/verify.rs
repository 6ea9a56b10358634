//! Credential verification: password logins and one-time email codes.

use rusqlite::Connection;

use crate::crypto::{generate_otp_code, hash_secret, secrets_match, verify_password};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::User;

/// Verify an email/password pair. Unknown email, disabled account, and wrong
/// password are indistinguishable to the caller.
pub fn verify_password_login(conn: &Connection, email: &str, password: &str) -> Result<User> {
    let user = queries::get_user_by_email(conn, email)?.ok_or(AppError::Unauthenticated)?;
    if !user.active {
        return Err(AppError::Unauthenticated);
    }
    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Unauthenticated);
    }
    Ok(user)
}

/// Issue a one-time sign-in code and email it. Always reports success to the
/// caller so the endpoint does not confirm which addresses have accounts.
pub fn issue_otp(state: &AppState, email: &str) -> Result<()> {
    let conn = state.db.get()?;
    let Some(user) = queries::get_user_by_email(&conn, email)? else {
        tracing::debug!("Sign-in code requested for unknown email");
        return Ok(());
    };
    if !user.active {
        return Ok(());
    }

    let code = generate_otp_code();
    let code_hash = hash_secret(&code);
    let expires_at = queries::now() + state.config.otp_ttl_minutes * 60;
    queries::insert_otp(&conn, &user.id, &code_hash, expires_at)?;

    // Delivery is fire-and-forget; a provider outage must not reveal
    // whether the address exists.
    let email_service = state.email.clone();
    let to = user.email.clone();
    let ttl = state.config.otp_ttl_minutes;
    tokio::spawn(async move {
        if let Err(e) = email_service.send_otp(&to, &code, ttl).await {
            tracing::error!(error = %e, "Failed to deliver sign-in code");
        }
    });

    Ok(())
}

/// Verify and consume a one-time code. Consumption is a conditional update,
/// so two racing verifies cannot both succeed on the same code.
pub fn verify_otp(conn: &Connection, email: &str, code: &str) -> Result<User> {
    let user = queries::get_user_by_email(conn, email)?.ok_or(AppError::Unauthenticated)?;
    if !user.active {
        return Err(AppError::Unauthenticated);
    }

    let otp = queries::get_latest_otp_for_user(conn, &user.id)?
        .ok_or(AppError::Unauthenticated)?;
    if otp.expires_at <= queries::now() {
        return Err(AppError::Unauthenticated);
    }
    if !secrets_match(&hash_secret(code), &otp.code_hash) {
        return Err(AppError::Unauthenticated);
    }
    if !queries::consume_otp(conn, &otp.id)? {
        return Err(AppError::Unauthenticated);
    }

    // A code round-trip proves the address; required before bootstrap admin
    // status applies.
    if !user.email_verified {
        queries::set_email_verified(conn, &user.id)?;
    }

    Ok(user)
}
