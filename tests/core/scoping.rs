//! Tenant isolation: client-supplied organization ids never select the
//! tenant, and a context without an active organization fails closed.

use plancast::db::queries;
use plancast::error::AppError;
use plancast::models::{CreateForecast, ForecastFilter, FunctionalRole, MembershipRole};
use plancast::tenancy::ScopeGuard;

use crate::helpers::*;

fn seed_forecast(app: &TestApp, guard: &ScopeGuard, name: &str, created_by: &str) {
    let conn = app.state.db.get().unwrap();
    let write = guard.scope_write(CreateForecast {
        name: name.into(),
        period: "2026-Q3".into(),
        quantity: 100,
        org_id: None,
    });
    queries::create_forecast(&conn, &write, created_by).unwrap();
}

#[test]
fn scoped_list_never_returns_foreign_rows() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx_a = member_context(
        &app,
        &org_a,
        "a@example.com",
        MembershipRole::Owner,
        FunctionalRole::Planner,
    );
    let ctx_b = member_context(
        &app,
        &org_b,
        "b@example.com",
        MembershipRole::Owner,
        FunctionalRole::Planner,
    );

    let guard_a = ScopeGuard::from_context(&ctx_a).unwrap();
    let guard_b = ScopeGuard::from_context(&ctx_b).unwrap();
    seed_forecast(&app, &guard_a, "alpha", &ctx_a.user.id);
    seed_forecast(&app, &guard_b, "bravo", &ctx_b.user.id);

    // The filter asks for B's data; the guard overrides it.
    let hostile_filter = ForecastFilter {
        org_id: Some(org_b.id.clone()),
        ..Default::default()
    };
    let scoped = guard_a.scope(hostile_filter);

    let conn = app.state.db.get().unwrap();
    let (rows, total) = queries::list_forecasts(&conn, &scoped).unwrap();
    assert_eq!(total, 1);
    assert!(rows.iter().all(|f| f.org_id == org_a.id));
    assert_eq!(rows[0].name, "alpha");
}

#[test]
fn scoped_point_lookup_hides_foreign_rows() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx_a = member_context(
        &app,
        &org_a,
        "a@example.com",
        MembershipRole::Owner,
        FunctionalRole::Planner,
    );
    let ctx_b = member_context(
        &app,
        &org_b,
        "b@example.com",
        MembershipRole::Owner,
        FunctionalRole::Planner,
    );

    let guard_b = ScopeGuard::from_context(&ctx_b).unwrap();
    seed_forecast(&app, &guard_b, "bravo", &ctx_b.user.id);

    let conn = app.state.db.get().unwrap();
    let foreign_id = queries::list_forecasts(&conn, &guard_b.scope(ForecastFilter::default()))
        .unwrap()
        .0[0]
        .id
        .clone();

    // A's guard sees "not found", indistinguishable from nonexistence.
    let guard_a = ScopeGuard::from_context(&ctx_a).unwrap();
    assert!(
        queries::get_forecast(&conn, &guard_a, &foreign_id)
            .unwrap()
            .is_none()
    );
    // And A cannot delete it either.
    assert!(!queries::delete_forecast(&conn, &guard_a, &foreign_id).unwrap());
    assert!(
        queries::get_forecast(&conn, &guard_b, &foreign_id)
            .unwrap()
            .is_some()
    );
}

#[test]
fn scope_write_stamps_the_authorized_org() {
    let app = test_app();
    let org_a = create_org(&app, "org-a");
    let org_b = create_org(&app, "org-b");
    let ctx = member_context(
        &app,
        &org_a,
        "a@example.com",
        MembershipRole::Owner,
        FunctionalRole::Planner,
    );

    let guard = ScopeGuard::from_context(&ctx).unwrap();
    // Payload claims org B; the write lands in A.
    let write = guard.scope_write(CreateForecast {
        name: "smuggled".into(),
        period: "2026-Q3".into(),
        quantity: 5,
        org_id: Some(org_b.id.clone()),
    });

    let conn = app.state.db.get().unwrap();
    let forecast = queries::create_forecast(&conn, &write, &ctx.user.id).unwrap();
    assert_eq!(forecast.org_id, org_a.id);
}

#[test]
fn null_active_org_fails_closed() {
    let app = test_app();
    let user = create_user(&app, "a@example.com");
    let token = open_session(&app, &user);
    let ctx = context_for(&app, &token).unwrap();

    let err = ScopeGuard::from_context(&ctx).unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}
