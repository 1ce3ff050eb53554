//! Request handling that is decided before any datastore access:
//! bearer token rejection reasons, body validation, routing and CORS.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;

use common::{app, offline_state, send, SECRET};
use family_api::services::auth::AuthService;

#[tokio::test]
async fn children_routes_require_a_bearer_token() {
    let app = app(&offline_state());

    for (method, uri) in [
        (Method::GET, "/children"),
        (Method::POST, "/children"),
        (Method::GET, "/children/1"),
        (Method::PUT, "/children/1"),
        (Method::DELETE, "/children/1"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["message"], "No token provided", "{method} {uri}");
    }
}

#[tokio::test]
async fn non_bearer_scheme_is_treated_as_missing() {
    let app = app(&offline_state());
    let request = Request::builder()
        .uri("/children")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "No token provided");
}

#[tokio::test]
async fn wrong_secret_and_expired_tokens_have_distinct_reasons() {
    let app = app(&offline_state());

    let forged = AuthService::generate_token(1, "13800000000", "not-the-server-secret").unwrap();
    let (status, body) = send(&app, Method::GET, "/children", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let stale = AuthService::generate_token_at(1, "13800000000", SECRET, Utc::now() - Duration::days(7) - Duration::minutes(1))
        .unwrap();
    let (status, body) = send(&app, Method::GET, "/children", Some(&stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");

    let (status, body) = send(&app, Method::GET, "/children", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn login_requires_phone_and_password() {
    let app = app(&offline_state());

    for body in [
        json!({}),
        json!({ "phoneNumber": "13800000000" }),
        json!({ "password": "secret" }),
        json!({ "phoneNumber": "", "password": "secret" }),
    ] {
        let (status, response) = send(&app, Method::POST, "/auth/login", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["message"], "phoneNumber and password are required");
    }
}

#[tokio::test]
async fn malformed_login_body_is_a_validation_error() {
    let app = app(&offline_state());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"phoneNumber\": "))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "message": "Invalid request body" }));

    // wrong field types do not leak deserializer details either
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "phoneNumber": 13800000000u64, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid request body" }));
}

#[tokio::test]
async fn overlong_phone_number_is_a_validation_error() {
    let app = app(&offline_state());
    let phone = "1".repeat(40);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "phoneNumber": phone, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "phoneNumber is too long");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app(&offline_state());
    let (status, body) = send(&app, Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn health_reports_unreachable_datastore() {
    let app = app(&offline_state());
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn metrics_endpoint_is_exposed() {
    let app = app(&offline_state());
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cors_allows_configured_and_local_origins_only() {
    let app = app(&offline_state());

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/children")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
            .body(Body::empty())
            .unwrap()
    };

    for origin in ["https://app.example.com", "http://localhost:5174"] {
        let response = app.clone().oneshot(preflight(origin)).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            origin
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    let response = app.clone().oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
