pub mod admin;
pub mod auth;
pub mod forecasts;
pub mod orgs;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::{GovernorLayer, key_extractor::SmartIpKeyExtractor};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::AppState;
use crate::middleware::session_auth;

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    // Per-client-IP limiter for the credential endpoints, so password and
    // one-time-code guessing is throttled at the edge.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("rate limiter configuration"),
    );

    // The limiter tracks one entry per client key; age them out.
    let limiter = governor_config.limiter().clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            limiter.retain_recent();
        }
    });

    // Credential guessing surface; throttled per client IP.
    let credential_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/request-code", post(auth::request_code))
        .route("/auth/verify-code", post(auth::verify_code))
        .layer(GovernorLayer::new(governor_config));

    // No session required.
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .merge(credential_routes);

    // Session required; authorization context resolved per request.
    let session_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/orgs", post(orgs::create_org).get(orgs::list_my_orgs))
        .route("/orgs/switch", post(orgs::switch_org))
        .route("/orgs/clear-active", post(orgs::clear_active_org))
        .route("/orgs/members", get(orgs::list_members).post(orgs::add_member))
        .route(
            "/orgs/members/{id}",
            put(orgs::update_member).delete(orgs::remove_member),
        )
        .route(
            "/forecasts",
            post(forecasts::create_forecast).get(forecasts::list_forecasts),
        )
        .route(
            "/forecasts/{id}",
            get(forecasts::get_forecast)
                .put(forecasts::update_forecast)
                .delete(forecasts::delete_forecast),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_auth));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
