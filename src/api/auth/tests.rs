use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn signup_login_me_roundtrip() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "Fresh.Student@Example.com",
                "fullName": "Fresh Student",
                "password": "correct-horse"
            })),
        ))
        .await
        .expect("signup");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["user"]["email"], "fresh.student@example.com");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["token_type"], "bearer");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "fresh.student@example.com",
                "password": "correct-horse"
            })),
        ))
        .await
        .expect("login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let token = body["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/me",
            Some(&token),
            None,
        ))
        .await
        .expect("me");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["full_name"], "Fresh Student");
}

#[tokio::test]
async fn signup_validates_email_password_and_uniqueness() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "not-an-email",
                "fullName": "Nobody",
                "password": "long-enough"
            })),
        ))
        .await
        .expect("signup bad email");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_EMAIL");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "short@example.com",
                "fullName": "Shorty",
                "password": "short"
            })),
        ))
        .await
        .expect("signup short password");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_PASSWORD");

    test_support::insert_student(ctx.state.db(), "taken@example.com").await;
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "taken@example.com",
                "fullName": "Late Arrival",
                "password": "long-enough"
            })),
        ))
        .await
        .expect("signup duplicate email");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_EXISTS");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let ctx = test_support::setup_test_context().await;

    test_support::insert_student(ctx.state.db(), "careful@example.com").await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "careful@example.com",
                "password": "wrong-password"
            })),
        ))
        .await
        .expect("login wrong password");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
