//! Credential-endpoint throttling: repeated attempts from one client are
//! cut off, and the limit is keyed per client.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::helpers::*;

fn login_request(client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(
            r#"{"email":"ghost@example.com","password":"wrong-password"}"#,
        ))
        .unwrap()
}

#[tokio::test]
async fn repeated_login_attempts_are_throttled() {
    let app = test_app();
    let router = plancast::handlers::router(app.state.clone());

    // Inside the burst allowance the endpoint answers normally.
    let first = router.clone().oneshot(login_request("203.0.113.9")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let mut statuses = Vec::new();
    for _ in 0..15 {
        let response = router.clone().oneshot(login_request("203.0.113.9")).await.unwrap();
        statuses.push(response.status());
    }
    assert!(
        statuses.contains(&StatusCode::TOO_MANY_REQUESTS),
        "burst was never throttled: {statuses:?}"
    );

    // A different client is unaffected by the first one's exhaustion.
    let other = router.clone().oneshot(login_request("203.0.113.10")).await.unwrap();
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}
