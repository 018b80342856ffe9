use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn raw_create_validates_session_and_summary() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "repadmin01@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports",
            Some(&token),
            Some(json!({"summary": {}})),
        ))
        .await
        .expect("create without session id");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_SESSION_ID");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports",
            Some(&token),
            Some(json!({"sessionId": uuid::Uuid::new_v4().to_string()})),
        ))
        .await
        .expect("create without summary");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_SUMMARY");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports",
            Some(&token),
            Some(json!({
                "sessionId": uuid::Uuid::new_v4().to_string(),
                "summary": "not an object"
            })),
        ))
        .await
        .expect("create with bad summary");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_SUMMARY_FORMAT");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports",
            Some(&token),
            Some(json!({
                "sessionId": uuid::Uuid::new_v4().to_string(),
                "summary": {"note": "orphan"}
            })),
        ))
        .await
        .expect("create for unknown session");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn generate_snapshots_an_active_session_without_mutating_it() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "repadmin02@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Snapshot", "SNA001", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "reporter01@example.com").await;
    let session =
        test_support::insert_active_session(ctx.state.db(), &exam.id, &student.id).await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&student_token),
            Some(json!({
                "sessionId": session.id,
                "violationType": "no_face",
                "severity": "medium",
                "description": "Face not visible for more than ten seconds"
            })),
        ))
        .await
        .expect("record violation");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports/generate",
            Some(&admin_token),
            Some(json!({"sessionId": session.id})),
        ))
        .await
        .expect("generate report");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    let summary = &body["summary"];
    assert_eq!(summary["status"], "active", "reports may cover active sessions");
    assert_eq!(summary["violations_count"], 1);
    assert_eq!(summary["violations_by_type"]["no_face"], 1);
    assert_eq!(summary["cheating_score"], 15);
    assert_eq!(summary["student_name"], "Student");
    assert_eq!(
        summary["flagged_incidents"][0],
        "Face not visible for more than ten seconds"
    );

    // Generation does not mutate the session.
    let unchanged = crate::repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(unchanged.status, crate::db::types::SessionStatus::Active);
    assert!(unchanged.ended_at.is_none());

    // Re-generation appends a second immutable report.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports/generate",
            Some(&admin_token),
            Some(json!({"sessionId": session.id})),
        ))
        .await
        .expect("regenerate report");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/reports?sessionId={}", session.id),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("list reports");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 2);
}

#[tokio::test]
async fn generate_requires_an_existing_session() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "repadmin03@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports/generate",
            Some(&token),
            Some(json!({})),
        ))
        .await
        .expect("generate without session id");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_SESSION_ID");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/reports/generate",
            Some(&token),
            Some(json!({"sessionId": uuid::Uuid::new_v4().to_string()})),
        ))
        .await
        .expect("generate for unknown session");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn reports_are_admin_only() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "reporter02@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/reports", Some(&token), None))
        .await
        .expect("list reports as student");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
