//! Session lifecycle: expiry, lazy deletion, revocation immediacy, the
//! touch window, and token-collision handling.

use plancast::auth::session::{create_session, revoke_all_sessions, validate_session};
use plancast::crypto::hash_secret;
use plancast::db::queries;
use plancast::error::AppError;
use plancast::models::ClientInfo;

use crate::helpers::*;

#[test]
fn valid_session_resolves_user() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let token = open_session(&app, &user);

    let conn = app.state.db.get().unwrap();
    let (session, resolved) = validate_session(&conn, &token).unwrap();
    assert_eq!(resolved.id, user.id);
    assert!(session.expires_at > queries::now());
}

#[test]
fn unknown_token_is_unauthenticated() {
    let app = test_app();
    let conn = app.state.db.get().unwrap();
    let err = validate_session(&conn, "sess_deadbeef").unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[test]
fn expired_session_is_invalid_and_reaped() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let conn = app.state.db.get().unwrap();

    // Insert with an expiry already in the past; the row physically exists.
    let token = "sess_expiredtoken";
    let hash = hash_secret(token);
    queries::insert_session(
        &conn,
        &user.id,
        &hash,
        queries::now() - 10,
        &ClientInfo::default(),
    )
    .unwrap();

    let err = validate_session(&conn, token).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));

    // Lazy deletion: the failed validate removed the row.
    assert!(
        queries::get_session_by_token_hash(&conn, &hash)
            .unwrap()
            .is_none()
    );
}

#[test]
fn revoke_all_is_immediate_for_every_token() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let t1 = open_session(&app, &user);
    let t2 = open_session(&app, &user);

    let conn = app.state.db.get().unwrap();
    assert!(validate_session(&conn, &t1).is_ok());

    let revoked = revoke_all_sessions(&conn, &user.id).unwrap();
    assert_eq!(revoked, 2);

    for token in [&t1, &t2] {
        let err = validate_session(&conn, token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}

#[test]
fn disabled_user_session_is_invalid() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let token = open_session(&app, &user);

    let conn = app.state.db.get().unwrap();
    queries::set_user_active(&conn, &user.id, false).unwrap();

    let err = validate_session(&conn, &token).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[test]
fn touch_is_throttled_within_the_window() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let token = open_session(&app, &user);

    let conn = app.state.db.get().unwrap();
    let (first, _) = validate_session(&conn, &token).unwrap();
    // Within the coalescing window nothing is written.
    let (second, _) = validate_session(&conn, &token).unwrap();
    assert_eq!(first.last_active_at, second.last_active_at);

    // Age the row past the window; the next validate refreshes it.
    let stale = queries::now() - 120;
    conn.execute(
        "UPDATE sessions SET last_active_at = ?1 WHERE id = ?2",
        rusqlite::params![stale, first.id],
    )
    .unwrap();
    validate_session(&conn, &token).unwrap();
    let refreshed = queries::get_session_by_token_hash(&conn, &hash_secret(&token))
        .unwrap()
        .unwrap();
    assert!(refreshed.last_active_at > stale);
}

#[test]
fn token_collision_is_a_fatal_error() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let conn = app.state.db.get().unwrap();

    let hash = hash_secret("sess_fixed");
    let expires = queries::now() + 3600;
    queries::insert_session(&conn, &user.id, &hash, expires, &ClientInfo::default()).unwrap();
    let err = queries::insert_session(&conn, &user.id, &hash, expires, &ClientInfo::default())
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}

#[test]
fn tokens_are_unique_per_login() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let conn = app.state.db.get().unwrap();

    let (s1, t1) =
        create_session(&conn, &app.state.config, &user.id, &ClientInfo::default()).unwrap();
    let (s2, t2) =
        create_session(&conn, &app.state.config, &user.id, &ClientInfo::default()).unwrap();
    assert_ne!(t1, t2);
    assert_ne!(s1.token_hash, s2.token_hash);
}
