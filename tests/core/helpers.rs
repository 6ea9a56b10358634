//! Shared fixtures: a file-backed state (two databases) in a temp dir,
//! plus shortcuts for users, organizations, memberships, and sessions.

#![allow(dead_code)]

use tempfile::TempDir;

use plancast::auth::{self, AuthContext, build_context};
use plancast::config::Config;
use plancast::crypto::hash_password;
use plancast::db::{AppState, queries};
use plancast::models::{
    ClientInfo, CreateMembership, CreateOrganization, FunctionalRole, Membership,
    MembershipRole, Organization, PlatformAdminRole, User,
};

pub struct TestApp {
    pub state: AppState,
    // Both database files live here; dropped with the test.
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: dir
            .path()
            .join("primary.db")
            .to_string_lossy()
            .into_owned(),
        audit_database_path: dir.path().join("audit.db").to_string_lossy().into_owned(),
        base_url: "http://localhost".into(),
        bootstrap_admin_emails: Vec::new(),
        dev_mode: true,
        audit_log_enabled: true,
        audit_log_retention_days: 90,
        session_ttl_hours: 24,
        otp_ttl_minutes: 15,
        resend_api_key: None,
        email_from: "test@example.com".into(),
    }
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir)).unwrap();
    TestApp { state, _dir: dir }
}

pub fn test_app_with(mutate: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    mutate(&mut config);
    let state = AppState::new(config).unwrap();
    TestApp { state, _dir: dir }
}

pub fn create_user(app: &TestApp, email: &str) -> User {
    let conn = app.state.db.get().unwrap();
    let hash = hash_password("hunter2hunter2").unwrap();
    queries::create_user(&conn, email, "Test User", &hash).unwrap()
}

pub fn create_org(app: &TestApp, slug: &str) -> Organization {
    let conn = app.state.db.get().unwrap();
    queries::create_organization(
        &conn,
        &CreateOrganization {
            name: format!("Org {slug}"),
            slug: slug.into(),
            plan: None,
        },
    )
    .unwrap()
}

pub fn add_membership(
    app: &TestApp,
    org: &Organization,
    user: &User,
    role: MembershipRole,
    functional_role: FunctionalRole,
) -> Membership {
    let conn = app.state.db.get().unwrap();
    queries::create_membership(
        &conn,
        &org.id,
        &CreateMembership {
            user_id: user.id.clone(),
            role,
            functional_role,
        },
    )
    .unwrap()
}

/// Point the user at an org directly, bypassing the switch workflow. For
/// setting up stale-pointer scenarios.
pub fn force_active_org(app: &TestApp, user: &User, org_id: Option<&str>) {
    let conn = app.state.db.get().unwrap();
    conn.execute(
        "UPDATE users SET active_org_id = ?1 WHERE id = ?2",
        rusqlite::params![org_id, user.id],
    )
    .unwrap();
}

pub fn open_session(app: &TestApp, user: &User) -> String {
    let conn = app.state.db.get().unwrap();
    let (_, token) = auth::session::create_session(
        &conn,
        &app.state.config,
        &user.id,
        &ClientInfo::default(),
    )
    .unwrap();
    token
}

pub fn context_for(app: &TestApp, token: &str) -> Result<AuthContext, plancast::error::AppError> {
    let conn = app.state.db.get().unwrap();
    build_context(&conn, &app.state.config, token, ClientInfo::default())
}

pub fn grant_admin(app: &TestApp, user: &User, role: PlatformAdminRole) -> String {
    let conn = app.state.db.get().unwrap();
    queries::insert_platform_admin(&conn, user, role, None)
        .unwrap()
        .id
}

/// A member with an open session, already switched into the given org.
pub fn member_context(
    app: &TestApp,
    org: &Organization,
    email: &str,
    role: MembershipRole,
    functional_role: FunctionalRole,
) -> AuthContext {
    let user = create_user(app, email);
    add_membership(app, org, &user, role, functional_role);
    let token = open_session(app, &user);
    let ctx = context_for(app, &token).unwrap();
    plancast::auth::switch_organization(&app.state, &ctx, &org.id).unwrap();
    context_for(app, &token).unwrap()
}

/// A platform admin (persisted grant) with an open session and no
/// memberships anywhere.
pub fn admin_context(app: &TestApp, email: &str, role: PlatformAdminRole) -> AuthContext {
    let user = create_user(app, email);
    grant_admin(app, &user, role);
    let token = open_session(app, &user);
    context_for(app, &token).unwrap()
}
