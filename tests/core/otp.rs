//! One-time code verification: single use, expiry, and the email-verified
//! side effect.

use plancast::auth::verify::{verify_otp, verify_password_login};
use plancast::crypto::hash_secret;
use plancast::db::queries;
use plancast::error::AppError;

use crate::helpers::*;

fn seed_otp(app: &TestApp, user_id: &str, code: &str, expires_in: i64) {
    let conn = app.state.db.get().unwrap();
    queries::insert_otp(
        &conn,
        user_id,
        &hash_secret(code),
        queries::now() + expires_in,
    )
    .unwrap();
}

#[test]
fn code_verifies_once_and_marks_email_verified() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    assert!(!user.email_verified);
    seed_otp(&app, &user.id, "123456", 600);

    let conn = app.state.db.get().unwrap();
    let verified = verify_otp(&conn, "alice@example.com", "123456").unwrap();
    assert_eq!(verified.id, user.id);
    assert!(
        queries::get_user_by_id(&conn, &user.id)
            .unwrap()
            .unwrap()
            .email_verified
    );

    // Single use: the same code is spent.
    let err = verify_otp(&conn, "alice@example.com", "123456").unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[test]
fn wrong_code_is_rejected_and_not_consumed() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    seed_otp(&app, &user.id, "123456", 600);

    let conn = app.state.db.get().unwrap();
    let err = verify_otp(&conn, "alice@example.com", "654321").unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));

    // The real code still works.
    verify_otp(&conn, "alice@example.com", "123456").unwrap();
}

#[test]
fn expired_code_is_rejected() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    seed_otp(&app, &user.id, "123456", -10);

    let conn = app.state.db.get().unwrap();
    let err = verify_otp(&conn, "alice@example.com", "123456").unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[test]
fn password_login_rejects_unknown_and_wrong_uniformly() {
    let app = test_app();
    create_user(&app, "alice@example.com");
    let conn = app.state.db.get().unwrap();

    let ok = verify_password_login(&conn, "alice@example.com", "hunter2hunter2");
    assert!(ok.is_ok());

    let wrong = verify_password_login(&conn, "alice@example.com", "nope").unwrap_err();
    let unknown = verify_password_login(&conn, "ghost@example.com", "nope").unwrap_err();
    assert!(matches!(wrong, AppError::Unauthenticated));
    assert!(matches!(unknown, AppError::Unauthenticated));
}

#[test]
fn email_lookup_is_case_insensitive() {
    let app = test_app();
    create_user(&app, "Alice@Example.com");
    let conn = app.state.db.get().unwrap();
    let found = queries::get_user_by_email(&conn, "ALICE@example.COM").unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().email, "alice@example.com");
}
