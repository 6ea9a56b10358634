mod admins;
mod audit_logs;
mod organizations;
mod users;

pub use admins::*;
pub use audit_logs::*;
pub use organizations::*;
pub use users::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::platform_admin_auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/organizations", get(list_organizations))
        .route("/admin/organizations/{id}", get(get_organization))
        .route("/admin/organizations/{id}/suspend", post(suspend_organization))
        .route(
            "/admin/organizations/{id}/reactivate",
            post(reactivate_organization),
        )
        .route("/admin/organizations/{id}/plan", put(change_organization_plan))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", get(get_user).delete(delete_user))
        .route("/admin/users/{id}/disable", post(disable_user))
        .route("/admin/users/{id}/enable", post(enable_user))
        .route("/admin/admins", get(list_admins).post(grant_admin))
        .route("/admin/admins/{id}", delete(revoke_admin))
        .route("/admin/audit/actions", get(query_admin_actions))
        .route("/admin/audit/activity", get(query_activity))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            platform_admin_auth,
        ))
}
