//! The organization switch workflow: membership validation, admin override,
//! suspension, and the pointer/audit atomicity contract.

use plancast::auth::switch_organization;
use plancast::db::queries;
use plancast::error::AppError;
use plancast::models::{
    AuditQuery, FunctionalRole, GrantSource, MembershipRole, OrgStatus, PlatformAdminRole,
};
use plancast::tenancy::Unscoped;

use crate::helpers::*;

fn active_org_of(app: &TestApp, user_id: &str) -> Option<String> {
    let conn = app.state.db.get().unwrap();
    queries::get_user_by_id(&conn, user_id)
        .unwrap()
        .unwrap()
        .active_org_id
}

#[test]
fn member_switches_between_their_orgs() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx = member_context(
        &app,
        &org_a,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );
    add_membership(
        &app,
        &org_b,
        &ctx.user,
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    let result = switch_organization(&app.state, &ctx, &org_b.id).unwrap();
    assert!(!result.admin_override);
    assert!(result.membership.is_some());
    assert_eq!(active_org_of(&app, &ctx.user.id), Some(org_b.id));
}

#[test]
fn non_member_switch_is_rejected_and_pointer_unchanged() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_c = create_org(&app, "org-c");
    let ctx = member_context(
        &app,
        &org_a,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    let err = switch_organization(&app.state, &ctx, &org_c.id).unwrap_err();
    assert!(matches!(err, AppError::NotMember));
    assert_eq!(active_org_of(&app, &ctx.user.id), Some(org_a.id));
}

#[test]
fn switch_to_unknown_org_is_not_found() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let ctx = member_context(
        &app,
        &org_a,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    let err = switch_organization(&app.state, &ctx, "ghost").unwrap_err();
    assert!(matches!(err, AppError::OrgNotFound));
}

#[test]
fn switch_to_suspended_org_is_rejected_even_for_admins() {
    let app = test_app();
    let org = create_org(&app, "frozen");
    {
        let conn = app.state.db.get().unwrap();
        queries::set_organization_status(&conn, &org.id, OrgStatus::Suspended).unwrap();
    }

    let ctx = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let err = switch_organization(&app.state, &ctx, &org.id).unwrap_err();
    assert!(matches!(err, AppError::OrgInactive));
    assert_eq!(active_org_of(&app, &ctx.user.id), None);
}

#[test]
fn admin_override_switch_is_recorded_with_grant_source() {
    let app = test_app();
    let org = create_org(&app, "tenant-d");
    let ctx = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);

    let result = switch_organization(&app.state, &ctx, &org.id).unwrap();
    assert!(result.admin_override);
    assert!(result.membership.is_none());
    assert_eq!(active_org_of(&app, &ctx.user.id), Some(org.id.clone()));

    let access = Unscoped::for_admin(ctx.admin.as_ref().unwrap());
    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(
            &access,
            &AuditQuery {
                action: Some("org.switch".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(actions.len(), 1);
    let record = &actions[0];
    assert_eq!(record.grant_source, Some(GrantSource::Granted));
    assert_eq!(record.org_id.as_deref(), Some(org.id.as_str()));
    let details = record.after.as_ref().unwrap();
    assert_eq!(details["admin_override"], serde_json::json!(true));
}

#[test]
fn member_switch_is_recorded_without_grant_source() {
    let app = test_app();
    let org = create_org(&app, "org-a");
    let ctx = member_context(
        &app,
        &org,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    let access = Unscoped::for_admin(&plancast::models::AdminGrant::Bootstrap {
        email: "test@example.com".into(),
    });
    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(
            &access,
            &AuditQuery {
                action: Some("org.switch".into()),
                actor_id: Some(ctx.user.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].grant_source, None);
}

#[test]
fn removing_a_membership_detaches_the_pointer_in_the_same_transaction() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx = member_context(
        &app,
        &org_a,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );
    let other = member_context(
        &app,
        &org_b,
        "bob@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );
    let membership_a = add_membership(
        &app,
        &org_a,
        &other.user,
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    let mut conn = app.state.db.get().unwrap();
    let tx = conn.transaction().unwrap();
    queries::delete_membership(&tx, &membership_a.id).unwrap();
    plancast::auth::switch::detach_user_from_org(&tx, &other.user.id, &org_a.id).unwrap();
    tx.commit().unwrap();

    // Bob was active in org-b; removal from org-a leaves his pointer alone.
    assert_eq!(active_org_of(&app, &other.user.id), Some(org_b.id.clone()));

    let membership_alice = {
        let conn = app.state.db.get().unwrap();
        queries::get_membership(&conn, &ctx.user.id, &org_a.id)
            .unwrap()
            .unwrap()
    };
    let mut conn = app.state.db.get().unwrap();
    let tx = conn.transaction().unwrap();
    queries::delete_membership(&tx, &membership_alice.id).unwrap();
    plancast::auth::switch::detach_user_from_org(&tx, &ctx.user.id, &org_a.id).unwrap();
    tx.commit().unwrap();

    // Alice was active in the org she was removed from; the pointer goes too.
    assert_eq!(active_org_of(&app, &ctx.user.id), None);
}

#[test]
fn failed_audit_write_rolls_the_switch_back() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx = member_context(
        &app,
        &org_a,
        "alice@example.com",
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );
    add_membership(
        &app,
        &org_b,
        &ctx.user,
        MembershipRole::Member,
        FunctionalRole::Viewer,
    );

    // Break the audit store out from under the writer.
    let audit_conn =
        rusqlite::Connection::open(&app.state.config.audit_database_path).unwrap();
    audit_conn.execute_batch("DROP TABLE admin_actions;").unwrap();

    let err = switch_organization(&app.state, &ctx, &org_b.id).unwrap_err();
    assert!(matches!(err, AppError::AuditWriteFailure(_)));
    // Fully failed: the pointer still names the original org.
    assert_eq!(active_org_of(&app, &ctx.user.id), Some(org_a.id));
}
