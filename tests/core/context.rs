//! Authorization-context resolution: membership checks, the orphaned
//! pointer condition, and admin override standing.

use plancast::error::AppError;
use plancast::models::{FunctionalRole, MembershipRole, OrgStatus, PlatformAdminRole};
use plancast::tenancy::ScopeGuard;

use crate::helpers::*;

#[test]
fn member_context_carries_roles() {
    let app = test_app();
    let org = create_org(&app, "acme");
    let ctx = member_context(
        &app,
        &org,
        "alice@example.com",
        MembershipRole::Admin,
        FunctionalRole::Planner,
    );

    assert_eq!(ctx.active_org_id(), Some(org.id.as_str()));
    assert_eq!(ctx.role(), Some(MembershipRole::Admin));
    assert_eq!(ctx.functional_role(), Some(FunctionalRole::Planner));
    assert!(ctx.can_write());
    assert!(!ctx.can_commit());
    assert!(!ctx.admin_override);
    assert!(!ctx.is_admin());
}

#[test]
fn no_active_org_yields_contextless_tenancy() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    let token = open_session(&app, &user);

    let ctx = context_for(&app, &token).unwrap();
    assert!(ctx.active_org.is_none());
    assert_eq!(ctx.role(), None);

    let err = ScopeGuard::from_context(&ctx).unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[test]
fn orphaned_pointer_is_surfaced_not_substituted() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_e = create_org(&app, "org-e");
    let user = create_user(&app, "alice@example.com");
    add_membership(
        &app,
        &org_a,
        &user,
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );
    // Pointer references E, where no membership exists.
    force_active_org(&app, &user, Some(&org_e.id));

    let token = open_session(&app, &user);
    let err = context_for(&app, &token).unwrap_err();
    assert!(matches!(err, AppError::OrphanedActiveOrg));
}

#[test]
fn pointer_to_missing_org_is_org_not_found() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");
    force_active_org(&app, &user, Some("no-such-org"));

    let token = open_session(&app, &user);
    let err = context_for(&app, &token).unwrap_err();
    assert!(matches!(err, AppError::OrgNotFound));
}

#[test]
fn admin_override_context_is_flagged_and_read_only() {
    let app = test_app();
    let org = create_org(&app, "tenant-d");
    let ctx = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);

    let result = plancast::auth::switch_organization(&app.state, &ctx, &org.id).unwrap();
    assert!(result.admin_override);

    let ctx = context_for(&app, &open_session_for(&app, &ctx.user.id)).unwrap();
    assert!(ctx.admin_override);
    assert!(ctx.membership.is_none());
    assert_eq!(ctx.functional_role(), Some(FunctionalRole::Viewer));
    assert!(!ctx.can_write());
    assert!(ctx.role().is_none());
}

#[test]
fn suspended_org_context_resolves_but_scoping_fails() {
    let app = test_app();
    let org = create_org(&app, "acme");
    let ctx = member_context(
        &app,
        &org,
        "alice@example.com",
        MembershipRole::Owner,
        FunctionalRole::Approver,
    );

    let conn = app.state.db.get().unwrap();
    plancast::db::queries::set_organization_status(&conn, &org.id, OrgStatus::Suspended).unwrap();
    drop(conn);

    // Context still resolves so the user can switch away...
    let token = open_session_for(&app, &ctx.user.id);
    let ctx = context_for(&app, &token).unwrap();
    assert_eq!(ctx.active_org_id(), Some(org.id.as_str()));

    // ...but tenant data is off limits.
    let err = ScopeGuard::from_context(&ctx).unwrap_err();
    assert!(matches!(err, AppError::OrgInactive));
}

fn open_session_for(app: &TestApp, user_id: &str) -> String {
    let conn = app.state.db.get().unwrap();
    let user = plancast::db::queries::get_user_by_id(&conn, user_id)
        .unwrap()
        .unwrap();
    drop(conn);
    open_session(app, &user)
}
