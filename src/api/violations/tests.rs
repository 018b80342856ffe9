use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn record_validates_enums_and_description() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "monitor01@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let cases = [
        (json!({"severity": "low", "description": "d"}), "MISSING_VIOLATION_TYPE"),
        (
            json!({"violationType": "eye_tracking", "severity": "low", "description": "d"}),
            "INVALID_VIOLATION_TYPE",
        ),
        (json!({"violationType": "no_face", "description": "d"}), "MISSING_SEVERITY"),
        (
            json!({"violationType": "no_face", "severity": "critical", "description": "d"}),
            "INVALID_SEVERITY",
        ),
        (json!({"violationType": "no_face", "severity": "low"}), "MISSING_DESCRIPTION"),
        (
            json!({"violationType": "no_face", "severity": "low", "description": "  "}),
            "MISSING_DESCRIPTION",
        ),
        (
            json!({
                "violationType": "no_face",
                "severity": "low",
                "description": "d",
                "sessionId": "17"
            }),
            "INVALID_SESSION_ID",
        ),
    ];

    for (payload, expected_code) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/violations",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("record violation");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected {expected_code}: {body}");
        assert_eq!(body["code"], expected_code);
    }
}

#[tokio::test]
async fn unattached_events_are_accepted_but_unknown_sessions_are_not() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "monitor02@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&token),
            Some(json!({
                "violationType": "phone_detected",
                "severity": "high",
                "description": "Mobile device detected in frame"
            })),
        ))
        .await
        .expect("record unattached violation");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert!(body["session_id"].is_null());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&token),
            Some(json!({
                "violationType": "phone_detected",
                "severity": "high",
                "description": "Mobile device detected in frame",
                "sessionId": uuid::Uuid::new_v4().to_string()
            })),
        ))
        .await
        .expect("record violation for unknown session");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn recording_updates_score_and_flags_past_threshold() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "monadmin01@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Risky", "RIS001", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "monitor03@example.com").await;
    let session =
        test_support::insert_active_session(ctx.state.db(), &exam.id, &student.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    // One high violation: 7 points * 5 = 35. Still active.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&token),
            Some(json!({
                "sessionId": session.id,
                "violationType": "multiple_faces",
                "severity": "high",
                "description": "Multiple people detected in camera frame"
            })),
        ))
        .await
        .expect("record first high violation");
    assert_eq!(response.status(), StatusCode::CREATED);

    let current = repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(current.cheating_score, 35);
    assert_eq!(current.status, crate::db::types::SessionStatus::Active);

    // A second high violation crosses the 70 threshold: flagged.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&token),
            Some(json!({
                "sessionId": session.id,
                "violationType": "phone_detected",
                "severity": "high",
                "description": "Mobile device detected in frame"
            })),
        ))
        .await
        .expect("record second high violation");
    assert_eq!(response.status(), StatusCode::CREATED);

    let flagged = repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(flagged.cheating_score, 70);
    assert_eq!(flagged.status, crate::db::types::SessionStatus::Flagged);
    assert!(flagged.ended_at.is_some(), "flagging stamps ended_at");
}

#[tokio::test]
async fn list_is_most_recent_first_with_filters() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "monadmin02@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Ordered", "ORD001", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "monitor04@example.com").await;
    let session =
        test_support::insert_active_session(ctx.state.db(), &exam.id, &student.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    for (violation_type, severity, description) in [
        ("tab_switch", "low", "first"),
        ("no_face", "medium", "second"),
        ("phone_detected", "high", "third"),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/violations",
                Some(&token),
                Some(json!({
                    "sessionId": session.id,
                    "violationType": violation_type,
                    "severity": severity,
                    "description": description
                })),
            ))
            .await
            .expect("record violation");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/violations?sessionId={}&limit=500", session.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list violations");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["limit"], 100);
    assert_eq!(body["total_count"], 3);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["description"], "third", "most recent first");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/violations?sessionId={}&severity=high", session.id),
            Some(&token),
            None,
        ))
        .await
        .expect("filter by severity");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["violation_type"], "phone_detected");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/violations?severity=catastrophic",
            Some(&token),
            None,
        ))
        .await
        .expect("filter with bad severity");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_SEVERITY");
}

#[tokio::test]
async fn edits_are_disabled_by_default() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "monadmin03@example.com").await;
    let student = test_support::insert_student(ctx.state.db(), "monitor05@example.com").await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&student_token),
            Some(json!({
                "violationType": "no_face",
                "severity": "low",
                "description": "Face not visible"
            })),
        ))
        .await
        .expect("record violation");
    let created = test_support::read_json(response).await;
    let violation_id = created["id"].as_str().expect("violation id");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/violations/{violation_id}"),
            Some(&admin_token),
            Some(json!({"severity": "high"})),
        ))
        .await
        .expect("edit violation");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
    assert_eq!(body["code"], "VIOLATION_EDITS_DISABLED");
}

#[tokio::test]
async fn admin_deletes_violation_and_session_is_rescored() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "monadmin04@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Undoable", "UND001", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "monitor06@example.com").await;
    let session =
        test_support::insert_active_session(ctx.state.db(), &exam.id, &student.id).await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/violations",
            Some(&student_token),
            Some(json!({
                "sessionId": session.id,
                "violationType": "multiple_faces",
                "severity": "high",
                "description": "Multiple people detected in camera frame"
            })),
        ))
        .await
        .expect("record violation");
    let created = test_support::read_json(response).await;
    let violation_id = created["id"].as_str().expect("violation id");

    let scored = repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(scored.cheating_score, 35);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/violations/{violation_id}"),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("delete violation");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let rescored = repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(rescored.cheating_score, 0, "deleting the only violation resets the score");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/violations/{violation_id}"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("delete as student");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
