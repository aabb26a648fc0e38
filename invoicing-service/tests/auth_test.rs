mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_returns_profile_and_token() {
    let app = TestApp::spawn();

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Alice", "email": "Alice@Example.com", "password": "secret123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["name"], "Alice");
    assert_eq!(response.body["email"], "alice@example.com");
    assert!(response.body["_id"].as_str().is_some());
    assert!(response.body["token"].as_str().is_some());
    assert!(response.body.get("password").is_none());
    assert!(response.body.get("passwordHash").is_none());
}

#[tokio::test]
async fn register_reports_every_invalid_field() {
    let app = TestApp::spawn();

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let errors = response.body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e == "Name is required"));
    assert!(errors.iter().any(|e| e == "Please include a valid email"));
    assert!(errors
        .iter()
        .any(|e| e == "Password must be at least 6 characters"));
    assert_eq!(response.body["missing"]["name"], true);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn();
    app.register("Alice", "alice@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "alice@example.com", "password": "secret123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "User already exists");
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = TestApp::spawn();
    app.register("Alice", "alice@example.com").await;

    let ok = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.body["token"].as_str().is_some());

    let bad = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad.body["message"], "Invalid email or password");
}

#[tokio::test]
async fn profile_can_be_read_and_updated() {
    let app = TestApp::spawn();
    let token = app.register("Alice", "alice@example.com").await;

    let response = app
        .request(
            Method::PUT,
            "/api/auth/me",
            Some(&token),
            Some(json!({ "businessName": "Acme", "phone": "555-0100" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["businessName"], "Acme");
    assert_eq!(response.body["name"], "Alice");

    let me = app
        .request(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["phone"], "555-0100");
    assert_eq!(me.body["email"], "alice@example.com");
}

#[tokio::test]
async fn profile_requires_a_token() {
    let app = TestApp::spawn();

    let response = app.request(Method::GET, "/api/auth/me", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
