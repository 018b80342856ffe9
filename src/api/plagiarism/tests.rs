use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn record_validates_fields() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "plag01@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let valid = json!({
        "fileName": "essay.txt",
        "fileUrl": "https://files.example.com/essay.txt",
        "plagiarismScore": 40,
        "matchedSources": [{"source": "wikipedia", "similarity": 40}],
        "analysisMethod": "tf-idf"
    });

    let cases = [
        ("fileName", json!(null), "MISSING_FILE_NAME"),
        ("fileUrl", json!(null), "MISSING_FILE_URL"),
        ("plagiarismScore", json!(null), "MISSING_PLAGIARISM_SCORE"),
        ("plagiarismScore", json!(150), "INVALID_PLAGIARISM_SCORE"),
        ("matchedSources", json!(null), "MISSING_MATCHED_SOURCES"),
        ("matchedSources", json!("not-an-array"), "INVALID_MATCHED_SOURCES"),
        ("analysisMethod", json!(null), "MISSING_ANALYSIS_METHOD"),
        ("analysisMethod", json!("bert"), "INVALID_ANALYSIS_METHOD"),
    ];

    for (field, value, expected_code) in cases {
        let mut payload = valid.clone();
        if value.is_null() {
            payload.as_object_mut().unwrap().remove(field);
        } else {
            payload[field] = value;
        }

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/plagiarism-checks",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("record check");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected {expected_code}: {body}");
        assert_eq!(body["code"], expected_code);
    }

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/plagiarism-checks",
            Some(&token),
            Some(valid),
        ))
        .await
        .expect("record valid check");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["plagiarism_score"], 40);
    assert_eq!(body["analysis_method"], "tf-idf");
}

#[tokio::test]
async fn attached_check_feeds_the_session_score() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "plagadmin01@example.com").await;
    let exam = test_support::insert_exam(ctx.state.db(), "Essay", "ESS001", &admin.id).await;
    let student = test_support::insert_student(ctx.state.db(), "plag02@example.com").await;
    let session =
        test_support::insert_active_session(ctx.state.db(), &exam.id, &student.id).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/plagiarism-checks",
            Some(&token),
            Some(json!({
                "sessionId": session.id,
                "fileName": "essay.txt",
                "fileUrl": "https://files.example.com/essay.txt",
                "plagiarismScore": 80,
                "matchedSources": [],
                "analysisMethod": "cosine"
            })),
        ))
        .await
        .expect("record attached check");
    assert_eq!(response.status(), StatusCode::CREATED);

    let scored = repositories::sessions::fetch_one_by_id(ctx.state.db(), &session.id)
        .await
        .expect("fetch session");
    assert_eq!(scored.cheating_score, 40, "plagiarism contributes at half weight");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/plagiarism-checks",
            Some(&token),
            Some(json!({
                "sessionId": uuid::Uuid::new_v4().to_string(),
                "fileName": "ghost.txt",
                "fileUrl": "https://files.example.com/ghost.txt",
                "plagiarismScore": 10,
                "matchedSources": [],
                "analysisMethod": "gpt"
            })),
        ))
        .await
        .expect("record check for unknown session");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn analyze_is_deterministic_and_orders_matches() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "plag03@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let payload = json!({
        "fileName": "answer.txt",
        "content": "binary search divides the array in half each step",
        "referenceSources": [
            {"source": "cookbook", "content": "cooking pasta requires salted water"},
            {"source": "lecture-notes", "content": "binary search divides the array in half each step"}
        ]
    });

    let mut scores = Vec::new();
    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/plagiarism-checks/analyze",
                Some(&token),
                Some(payload.clone()),
            ))
            .await
            .expect("analyze submission");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {body}");
        assert_eq!(body["analysis_method"], "tf-idf");
        assert_eq!(body["file_url"], "local://answer.txt");

        let matched = body["matched_sources"].as_array().unwrap();
        assert_eq!(matched[0]["source"], "lecture-notes", "best match first");
        assert_eq!(matched[0]["similarity"], 100);

        scores.push(body["plagiarism_score"].as_i64().unwrap());
    }

    assert_eq!(scores[0], scores[1], "same inputs must produce the same estimate");
    assert_eq!(scores[0], 100);
}

#[tokio::test]
async fn analyze_requires_file_name_and_content() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "plag04@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/plagiarism-checks/analyze",
            Some(&token),
            Some(json!({"content": "some text"})),
        ))
        .await
        .expect("analyze without file name");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_FILE_NAME");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/plagiarism-checks/analyze",
            Some(&token),
            Some(json!({"fileName": "a.txt"})),
        ))
        .await
        .expect("analyze without content");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "MISSING_CONTENT");
}

#[tokio::test]
async fn list_filters_by_method_and_session() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "plag05@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    for method in ["tf-idf", "cosine"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/plagiarism-checks",
                Some(&token),
                Some(json!({
                    "fileName": format!("{method}.txt"),
                    "fileUrl": "https://files.example.com/x.txt",
                    "plagiarismScore": 10,
                    "matchedSources": [],
                    "analysisMethod": method
                })),
            ))
            .await
            .expect("record check");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/plagiarism-checks?analysisMethod=cosine",
            Some(&token),
            None,
        ))
        .await
        .expect("list checks");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["analysis_method"], "cosine");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/plagiarism-checks?analysisMethod=magic",
            Some(&token),
            None,
        ))
        .await
        .expect("list with bad method");
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "INVALID_ANALYSIS_METHOD");
}
