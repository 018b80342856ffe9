use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn exam_payload(class_code: &str) -> serde_json::Value {
    json!({
        "title": "CS101 Final Exam",
        "durationMinutes": 60,
        "classCode": class_code,
        "questions": [{
            "id": "q1",
            "type": "multiple-choice",
            "prompt": "What is 2 + 2?",
            "options": ["3", "4"],
            "correctAnswer": "4",
            "points": 5
        }]
    })
}

#[tokio::test]
async fn admin_creates_exam_with_uppercased_code() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin01@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload("exam001")),
        ))
        .await
        .expect("create exam");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["class_code"], "EXAM001");
    assert_eq!(body["duration_minutes"], 60);
    assert_eq!(body["created_by"], json!(admin.id));
}

#[tokio::test]
async fn create_exam_validates_required_fields() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin02@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let cases = [
        (json!({"durationMinutes": 60, "classCode": "X1", "questions": []}), "MISSING_TITLE"),
        (json!({"title": "T", "classCode": "X1", "questions": []}), "MISSING_DURATION"),
        (
            json!({"title": "T", "durationMinutes": 0, "classCode": "X1", "questions": []}),
            "INVALID_DURATION",
        ),
        (json!({"title": "T", "durationMinutes": 60, "classCode": "X1"}), "MISSING_QUESTIONS"),
        (
            json!({"title": "T", "durationMinutes": 60, "classCode": "X1", "questions": {"not": "array"}}),
            "INVALID_QUESTIONS",
        ),
        (json!({"title": "T", "durationMinutes": 60, "questions": []}), "MISSING_CLASS_CODE"),
    ];

    for (payload, expected_code) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/exams",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("create exam");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected {expected_code}: {body}");
        assert_eq!(body["code"], expected_code);
    }
}

#[tokio::test]
async fn duplicate_exam_code_is_a_conflict() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin03@example.com").await;
    test_support::insert_exam(ctx.state.db(), "First", "DUP001", &admin.id).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload("dup001")),
        ))
        .await
        .expect("create exam");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "CLASS_CODE_EXISTS");
}

#[tokio::test]
async fn exam_code_lookup_is_case_insensitive() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin04@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Midterm", "MID123", &admin.id).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    for variant in ["mid123", "MID123", "Mid123"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/exams/by-code/{variant}"),
                Some(&token),
                None,
            ))
            .await
            .expect("lookup exam");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "variant {variant}: {body}");
        assert_eq!(body["id"], json!(exam.id));
    }

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/by-code/NOPE99",
            Some(&token),
            None,
        ))
        .await
        .expect("lookup unknown exam");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "EXAM_NOT_FOUND");
}

#[tokio::test]
async fn update_revalidates_code_uniqueness_excluding_self() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin05@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "One", "ONE111", &admin.id).await;
    test_support::insert_exam(ctx.state.db(), "Two", "TWO222", &admin.id).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    // Re-submitting the exam's own code is not a conflict.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&token),
            Some(json!({"classCode": "one111", "title": "One Updated"})),
        ))
        .await
        .expect("update exam");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["title"], "One Updated");
    assert_eq!(body["class_code"], "ONE111");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&token),
            Some(json!({"classCode": "TWO222"})),
        ))
        .await
        .expect("update exam to taken code");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CLASS_CODE_EXISTS");
}

#[tokio::test]
async fn join_with_code_creates_a_fresh_active_session() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "examadmin06@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Join Me", "JOI123", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "joiner01@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"classCode": "joi123", "studentId": student.id})),
        ))
        .await
        .expect("join exam");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["session"]["status"], "active");
    assert_eq!(body["session"]["cheating_score"], 0);
    assert_eq!(body["session"]["tab_switches"], 0);
    assert!(body["session"]["ended_at"].is_null());
    assert_eq!(body["exam"]["id"], json!(exam.id));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"classCode": "JOI123", "studentId": student.id})),
        ))
        .await
        .expect("join exam again");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "SESSION_ALREADY_EXISTS");
}

#[tokio::test]
async fn join_with_code_validates_inputs() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "joiner02@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"studentId": student.id})),
        ))
        .await
        .expect("join without code");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_CLASS_CODE");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"classCode": "ANY123"})),
        ))
        .await
        .expect("join without student");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_STUDENT_ID");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"classCode": "ANY123", "studentId": "42"})),
        ))
        .await
        .expect("join with malformed student id");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_STUDENT_ID");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/join-with-code",
            Some(&token),
            Some(json!({"classCode": "GHOST1", "studentId": student.id})),
        ))
        .await
        .expect("join unknown exam");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "EXAM_NOT_FOUND");
}
