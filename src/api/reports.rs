use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{clamp_window, default_limit, PaginatedResponse};
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::report::{GenerateReportRequest, ReportCreate, ReportResponse};
use crate::services::reports::{build_summary, ReportInputs};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/generate", post(generate_report))
        .route("/:report_id", get(get_report).delete(delete_report))
}

#[derive(Debug, Deserialize)]
struct ListReportsQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "sessionId")]
    session_id: Option<String>,
}

/// Raw create: the caller supplies the summary object. Reports are
/// immutable once stored; re-generation writes a new row.
async fn create_report(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ReportCreate>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let Some(session_id) = payload.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_SESSION_ID", "sessionId is required"));
    };
    validate_id(session_id, "INVALID_SESSION_ID", "session id")?;

    let Some(summary) = payload.summary.clone() else {
        return Err(ApiError::bad_request("MISSING_SUMMARY", "summary is required"));
    };
    if !summary.is_object() {
        return Err(ApiError::bad_request(
            "INVALID_SUMMARY_FORMAT",
            "summary must be a valid JSON object",
        ));
    }

    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?;
    if session.is_none() {
        return Err(ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"));
    }

    let report = repositories::reports::create(
        state.db(),
        repositories::reports::CreateReport {
            id: &Uuid::new_v4().to_string(),
            session_id,
            generated_at: primitive_now_utc(),
            summary,
            pdf_url: payload.pdf_url.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create report"))?;

    Ok((StatusCode::CREATED, Json(ReportResponse::from_db(report))))
}

/// Server-side assembly: loads the session with its violation log and
/// newest plagiarism check, recomputes the score and snapshots the
/// whole thing. Works for active sessions too and never mutates the
/// session.
async fn generate_report(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let Some(session_id) = payload.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_SESSION_ID", "sessionId is required"));
    };
    validate_id(session_id, "INVALID_SESSION_ID", "session id")?;

    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"))?;

    let exam = repositories::exams::find_by_id(state.db(), &session.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| {
            ApiError::internal("exam row missing for session", "Failed to load session exam")
        })?;

    let student = repositories::users::find_by_id(state.db(), &session.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| {
            ApiError::internal("student row missing for session", "Failed to load session student")
        })?;

    let violations = repositories::violations::list_for_session(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session violations"))?;

    let plagiarism =
        repositories::plagiarism_checks::find_latest_for_session(state.db(), session_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load plagiarism check"))?;

    let summary = build_summary(
        state.settings().risk(),
        ReportInputs {
            session: &session,
            exam: &exam,
            student: &student,
            violations: &violations,
            plagiarism: plagiarism.as_ref(),
        },
    );
    let summary_value = serde_json::to_value(&summary)
        .map_err(|e| ApiError::internal(e, "Failed to serialize report summary"))?;

    let report = repositories::reports::create(
        state.db(),
        repositories::reports::CreateReport {
            id: &Uuid::new_v4().to_string(),
            session_id,
            generated_at: primitive_now_utc(),
            summary: summary_value,
            pdf_url: payload.pdf_url.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create report"))?;

    metrics::counter!("reports_generated_total").increment(1);

    Ok((StatusCode::CREATED, Json(ReportResponse::from_db(report))))
}

async fn list_reports(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<PaginatedResponse<ReportResponse>>, ApiError> {
    let session_id = match query.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(session_id) => {
            validate_id(session_id, "INVALID_SESSION_ID", "session id")?;
            Some(session_id.to_string())
        }
        None => None,
    };

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let reports = repositories::reports::list(state.db(), session_id.as_deref(), offset, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list reports"))?;
    let total_count = repositories::reports::count(state.db(), session_id.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count reports"))?;

    Ok(Json(PaginatedResponse {
        items: reports.into_iter().map(ReportResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn get_report(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    validate_id(&report_id, "INVALID_ID", "report id")?;

    let report = repositories::reports::find_by_id(state.db(), &report_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch report"))?
        .ok_or_else(|| ApiError::not_found("REPORT_NOT_FOUND", "Report not found"))?;

    Ok(Json(ReportResponse::from_db(report)))
}

async fn delete_report(
    Path(report_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&report_id, "INVALID_ID", "report id")?;

    let deleted = repositories::reports::delete(state.db(), &report_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete report"))?;

    if !deleted {
        return Err(ApiError::not_found("REPORT_NOT_FOUND", "Report not found"));
    }

    tracing::info!(
        admin_id = %admin.id,
        report_id = %report_id,
        action = "report_delete",
        "Admin deleted report"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests;
