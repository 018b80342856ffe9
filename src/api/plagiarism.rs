use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{clamp_window, default_limit, PaginatedResponse};
use crate::api::validation::{parse_analysis_method, validate_id, validate_plagiarism_score};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::plagiarism::{
    AnalyzeRequest, PlagiarismCheckCreate, PlagiarismCheckResponse,
};
use crate::services::{plagiarism, risk};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_checks).post(record_check))
        .route("/analyze", post(analyze_submission))
        .route("/:check_id", get(get_check).delete(delete_check))
}

#[derive(Debug, Deserialize)]
struct ListChecksQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "analysisMethod")]
    analysis_method: Option<String>,
}

/// Store an externally computed plagiarism estimate. Attached sessions
/// are rescored in the same transaction because the estimate feeds the
/// risk aggregate.
async fn record_check(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PlagiarismCheckCreate>,
) -> Result<(StatusCode, Json<PlagiarismCheckResponse>), ApiError> {
    let Some(file_name) = payload.file_name.as_deref().map(str::trim).filter(|f| !f.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_FILE_NAME", "fileName is required"));
    };

    let Some(file_url) = payload.file_url.as_deref().map(str::trim).filter(|f| !f.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_FILE_URL", "fileUrl is required"));
    };

    let Some(raw_score) = payload.plagiarism_score else {
        return Err(ApiError::bad_request(
            "MISSING_PLAGIARISM_SCORE",
            "plagiarismScore is required",
        ));
    };
    let plagiarism_score = validate_plagiarism_score(raw_score)?;

    let Some(matched_sources) = payload.matched_sources.clone() else {
        return Err(ApiError::bad_request(
            "MISSING_MATCHED_SOURCES",
            "matchedSources is required",
        ));
    };
    if !matched_sources.is_array() {
        return Err(ApiError::bad_request(
            "INVALID_MATCHED_SOURCES",
            "matchedSources must be a valid JSON array",
        ));
    }

    let Some(raw_method) =
        payload.analysis_method.as_deref().map(str::trim).filter(|m| !m.is_empty())
    else {
        return Err(ApiError::bad_request(
            "MISSING_ANALYSIS_METHOD",
            "analysisMethod is required",
        ));
    };
    let analysis_method = parse_analysis_method(raw_method)?;

    let session_id = match payload.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(session_id) => {
            validate_id(session_id, "INVALID_SESSION_ID", "session id")?;
            Some(session_id.to_string())
        }
        None => None,
    };

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let session = match session_id.as_deref() {
        Some(session_id) => Some(
            repositories::sessions::fetch_for_update(&mut *tx, session_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
                .ok_or_else(|| {
                    ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found")
                })?,
        ),
        None => None,
    };

    let check = repositories::plagiarism_checks::create(
        &mut *tx,
        repositories::plagiarism_checks::CreatePlagiarismCheck {
            id: &Uuid::new_v4().to_string(),
            session_id: session_id.as_deref(),
            file_name,
            file_url,
            plagiarism_score,
            matched_sources,
            analysis_method,
            checked_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record plagiarism check"))?;

    if let Some(session) = session.as_ref() {
        risk::rescore_session(&mut *tx, state.settings().risk(), session)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to rescore exam session"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(PlagiarismCheckResponse::from_db(check))))
}

/// Run the configured similarity strategy over submitted text and store
/// the outcome as a plagiarism check. The baseline analyzer is
/// deterministic; the strategy seam is where a real model would plug
/// in.
async fn analyze_submission(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<PlagiarismCheckResponse>), ApiError> {
    let Some(file_name) = payload.file_name.as_deref().map(str::trim).filter(|f| !f.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_FILE_NAME", "fileName is required"));
    };

    let Some(content) = payload.content.as_deref().filter(|c| !c.trim().is_empty()) else {
        return Err(ApiError::bad_request("MISSING_CONTENT", "content is required"));
    };

    let session_id = match payload.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(session_id) => {
            validate_id(session_id, "INVALID_SESSION_ID", "session id")?;
            Some(session_id.to_string())
        }
        None => None,
    };

    let sources: Vec<(String, String)> = payload
        .reference_sources
        .into_iter()
        .map(|reference| (reference.source, reference.content))
        .collect();

    let analyzer = state.analyzer();
    let outcome = plagiarism::analyze(analyzer, content, &sources);
    let matched_sources = serde_json::to_value(&outcome.matched_sources)
        .map_err(|e| ApiError::internal(e, "Failed to serialize matched sources"))?;
    let file_url = payload
        .file_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("local://{file_name}"));

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let session = match session_id.as_deref() {
        Some(session_id) => Some(
            repositories::sessions::fetch_for_update(&mut *tx, session_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
                .ok_or_else(|| {
                    ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found")
                })?,
        ),
        None => None,
    };

    let check = repositories::plagiarism_checks::create(
        &mut *tx,
        repositories::plagiarism_checks::CreatePlagiarismCheck {
            id: &Uuid::new_v4().to_string(),
            session_id: session_id.as_deref(),
            file_name,
            file_url: &file_url,
            plagiarism_score: outcome.score,
            matched_sources,
            analysis_method: analyzer.method(),
            checked_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record plagiarism check"))?;

    if let Some(session) = session.as_ref() {
        risk::rescore_session(&mut *tx, state.settings().risk(), session)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to rescore exam session"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(PlagiarismCheckResponse::from_db(check))))
}

async fn list_checks(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListChecksQuery>,
) -> Result<Json<PaginatedResponse<PlagiarismCheckResponse>>, ApiError> {
    let session_id = match query.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(session_id) => {
            validate_id(session_id, "INVALID_SESSION_ID", "session id")?;
            Some(session_id.to_string())
        }
        None => None,
    };
    let analysis_method = match query.analysis_method.as_deref() {
        Some(raw) => Some(parse_analysis_method(raw)?),
        None => None,
    };

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let checks = repositories::plagiarism_checks::list(
        state.db(),
        session_id.as_deref(),
        analysis_method,
        offset,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list plagiarism checks"))?;
    let total_count = repositories::plagiarism_checks::count(
        state.db(),
        session_id.as_deref(),
        analysis_method,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count plagiarism checks"))?;

    Ok(Json(PaginatedResponse {
        items: checks.into_iter().map(PlagiarismCheckResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn get_check(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(check_id): Path<String>,
) -> Result<Json<PlagiarismCheckResponse>, ApiError> {
    validate_id(&check_id, "INVALID_ID", "check id")?;

    let check = repositories::plagiarism_checks::find_by_id(state.db(), &check_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch plagiarism check"))?
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", "Plagiarism check not found"))?;

    Ok(Json(PlagiarismCheckResponse::from_db(check)))
}

async fn delete_check(
    Path(check_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&check_id, "INVALID_ID", "check id")?;

    let deleted = repositories::plagiarism_checks::delete(state.db(), &check_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete plagiarism check"))?;

    if !deleted {
        return Err(ApiError::not_found("NOT_FOUND", "Plagiarism check not found"));
    }

    tracing::info!(
        admin_id = %admin.id,
        check_id = %check_id,
        action = "plagiarism_check_delete",
        "Admin deleted plagiarism check"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests;
