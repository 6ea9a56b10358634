//! The two audit streams: must-succeed admin actions with snapshots,
//! best-effort activity events, deletion ordering, and retention.

use plancast::audit::ActivityEntry;
use plancast::auth::admin;
use plancast::db::queries;
use plancast::models::{AdminGrant, AuditQuery, ClientInfo, PlatformAdminRole};
use plancast::tenancy::Unscoped;

use crate::helpers::*;

fn unscoped() -> Unscoped {
    Unscoped::for_admin(&AdminGrant::Bootstrap {
        email: "test@example.com".into(),
    })
}

#[test]
fn disable_writes_before_and_after_snapshots() {
    let app = test_app();
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "victim@example.com");
    let token = open_session(&app, &target);

    admin::disable_user(&app.state, &actor, &target.id, Some("abuse")).unwrap();

    // Sessions are gone with the flag flip.
    assert!(context_for(&app, &token).is_err());

    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(
            &unscoped(),
            &AuditQuery {
                action: Some("user.disable".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(actions.len(), 1);
    let record = &actions[0];
    assert_eq!(record.target_id, target.id);
    assert_eq!(record.reason.as_deref(), Some("abuse"));
    assert_eq!(record.before.as_ref().unwrap()["active"], true);
    assert_eq!(record.after.as_ref().unwrap()["active"], false);
    // Snapshots never include the password hash.
    assert!(record.before.as_ref().unwrap().get("password_hash").is_none());
}

#[test]
fn deletion_records_first_then_purges_the_targets_trails() {
    let app = test_app();
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "leaver@example.com");
    let org = create_org(&app, "acme");

    // Leave some activity attributed to the target.
    app.state.audit.record_activity(&ActivityEntry {
        actor_id: &target.id,
        actor_email: &target.email,
        action: "forecast.create",
        target_type: "forecast",
        target_id: "f-1",
        org_id: Some(&org.id),
        details: None,
        client: &ClientInfo::default(),
    });

    admin::delete_user(&app.state, &actor, &target.id, Some("gdpr request")).unwrap();

    let conn = app.state.db.get().unwrap();
    assert!(queries::get_user_by_id(&conn, &target.id).unwrap().is_none());

    // The deletion itself is on record, attributed to the actor...
    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(
            &unscoped(),
            &AuditQuery {
                action: Some("user.delete".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].actor_id, actor.user.id);
    assert_eq!(actions[0].target_id, target.id);
    assert!(actions[0].before.is_some());

    // ...while the target's own trails are purged.
    let (activity, _) = app
        .state
        .audit
        .query_activity(
            &unscoped(),
            &AuditQuery {
                actor_id: Some(target.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(activity.is_empty());
}

#[test]
fn deletion_purges_records_targeting_the_user_except_the_deletion_itself() {
    let app = test_app();
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "leaver@example.com");

    // Build up history naming the target.
    admin::disable_user(&app.state, &actor, &target.id, Some("abuse")).unwrap();
    admin::enable_user(&app.state, &actor, &target.id, Some("appeal upheld")).unwrap();

    admin::delete_user(&app.state, &actor, &target.id, None).unwrap();

    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(
            &unscoped(),
            &AuditQuery {
                target_id: Some(target.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    // The disable/enable history is gone; the deletion record survives.
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, "user.delete");
}

#[test]
fn failed_admin_action_record_aborts_the_deletion() {
    let app = test_app();
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "leaver@example.com");

    let audit_conn =
        rusqlite::Connection::open(&app.state.config.audit_database_path).unwrap();
    audit_conn.execute_batch("DROP TABLE admin_actions;").unwrap();

    assert!(admin::delete_user(&app.state, &actor, &target.id, None).is_err());

    // Nothing changed: the user and their sessions still exist.
    let conn = app.state.db.get().unwrap();
    assert!(queries::get_user_by_id(&conn, &target.id).unwrap().is_some());
}

#[test]
fn activity_writes_are_best_effort() {
    let app = test_app();
    let user = create_user(&app, "alice@example.com");

    let audit_conn =
        rusqlite::Connection::open(&app.state.config.audit_database_path).unwrap();
    audit_conn
        .execute_batch("DROP TABLE activity_events;")
        .unwrap();

    // Does not panic or propagate.
    app.state.audit.record_activity(&ActivityEntry {
        actor_id: &user.id,
        actor_email: &user.email,
        action: "forecast.create",
        target_type: "forecast",
        target_id: "f-1",
        org_id: None,
        details: None,
        client: &ClientInfo::default(),
    });
}

#[test]
fn retention_purge_ages_out_activity_but_keeps_admin_actions() {
    let app = test_app();
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "victim@example.com");
    admin::disable_user(&app.state, &actor, &target.id, None).unwrap();

    app.state.audit.record_activity(&ActivityEntry {
        actor_id: &actor.user.id,
        actor_email: &actor.user.email,
        action: "forecast.create",
        target_type: "forecast",
        target_id: "f-1",
        org_id: None,
        details: None,
        client: &ClientInfo::default(),
    });

    // Backdate everything, then purge with a 30-day horizon.
    let audit_conn =
        rusqlite::Connection::open(&app.state.config.audit_database_path).unwrap();
    let old = queries::now() - 90 * 24 * 3600;
    audit_conn
        .execute("UPDATE activity_events SET timestamp = ?1", [old])
        .unwrap();
    audit_conn
        .execute("UPDATE admin_actions SET timestamp = ?1", [old])
        .unwrap();

    let purged = app.state.audit.purge_expired(30).unwrap();
    assert_eq!(purged, 1);

    let (actions, _) = app
        .state
        .audit
        .query_admin_actions(&unscoped(), &AuditQuery::default())
        .unwrap();
    assert!(!actions.is_empty());
    let (activity, _) = app
        .state
        .audit
        .query_activity(&unscoped(), &AuditQuery::default())
        .unwrap();
    assert!(activity.is_empty());
}

#[test]
fn disabled_audit_logging_skips_writes_without_failing() {
    let app = test_app_with(|c| c.audit_log_enabled = false);
    let actor = admin_context(&app, "root@example.com", PlatformAdminRole::SuperAdmin);
    let target = create_user(&app, "victim@example.com");

    admin::disable_user(&app.state, &actor, &target.id, None).unwrap();

    let (actions, total) = app
        .state
        .audit
        .query_admin_actions(&unscoped(), &AuditQuery::default())
        .unwrap();
    assert!(actions.is_empty());
    assert_eq!(total, 0);
}
