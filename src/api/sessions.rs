use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_session_access, CurrentAdmin, CurrentUser};
use crate::api::pagination::{clamp_window, default_limit, PaginatedResponse};
use crate::api::validation::{
    parse_session_status, validate_cheating_score, validate_id, validate_tab_switches,
};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{SessionStatus, ViolationType};
use crate::repositories;
use crate::schemas::session::{
    SessionCreate, SessionResponse, SessionUpdate, SubmitResponse, TabSwitchResponse,
};
use crate::services::risk;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/:session_id", get(get_session).patch(update_session).delete(delete_session))
        .route("/:session_id/tab-switch", post(record_tab_switch))
        .route("/:session_id/submit", post(submit_session))
}

#[derive(Debug, Deserialize)]
struct ListSessionsQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "examId")]
    exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    student_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

async fn create_session(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SessionCreate>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let Some(exam_id) = payload.exam_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_EXAM_ID", "Valid examId is required"));
    };
    validate_id(exam_id, "MISSING_EXAM_ID", "examId")?;

    let Some(student_id) =
        payload.student_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_STUDENT_ID", "Valid studentId is required"));
    };
    validate_id(student_id, "MISSING_STUDENT_ID", "studentId")?;

    require_session_access(&user, student_id)?;

    let status = match payload.status.as_deref() {
        Some(raw) => parse_session_status(raw)?,
        None => SessionStatus::Active,
    };
    let cheating_score = match payload.cheating_score {
        Some(raw) => validate_cheating_score(raw)?,
        None => 0,
    };
    let tab_switches = match payload.tab_switches {
        Some(raw) => validate_tab_switches(raw)?,
        None => 0,
    };

    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;
    if exam.is_none() {
        return Err(ApiError::not_found("EXAM_NOT_FOUND", "Exam not found"));
    }

    let student = repositories::users::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;
    if student.is_none() {
        return Err(ApiError::not_found("STUDENT_NOT_FOUND", "Student not found"));
    }

    let session = repositories::sessions::create(
        state.db(),
        repositories::sessions::CreateSession {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            student_id,
            started_at: primitive_now_utc(),
            status,
            cheating_score,
            tab_switches,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam session"))?
    .ok_or_else(|| {
        ApiError::conflict("SESSION_ALREADY_EXISTS", "Student already has a session for this exam")
    })?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from_db(session))))
}

async fn list_sessions(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<PaginatedResponse<SessionResponse>>, ApiError> {
    let exam_id = match query.exam_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(exam_id) => {
            validate_id(exam_id, "INVALID_EXAM_ID", "examId")?;
            Some(exam_id.to_string())
        }
        None => None,
    };
    let student_id = match query.student_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(student_id) => {
            validate_id(student_id, "INVALID_STUDENT_ID", "studentId")?;
            Some(student_id.to_string())
        }
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(raw) => Some(parse_session_status(raw)?),
        None => None,
    };

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let sessions = repositories::sessions::list(
        state.db(),
        exam_id.as_deref(),
        student_id.as_deref(),
        status,
        offset,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exam sessions"))?;
    let total_count = repositories::sessions::count(
        state.db(),
        exam_id.as_deref(),
        student_id.as_deref(),
        status,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count exam sessions"))?;

    Ok(Json(PaginatedResponse {
        items: sessions.into_iter().map(SessionResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn get_session(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    validate_id(&session_id, "INVALID_ID", "session id")?;

    let session = repositories::sessions::find_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"))?;

    Ok(Json(SessionResponse::from_db(session)))
}

/// Partial update of mutable session fields. Terminal sessions admit no
/// further lifecycle changes; `started_at` and `ended_at` are never
/// client-writable.
async fn update_session(
    Path(session_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SessionUpdate>,
) -> Result<Json<SessionResponse>, ApiError> {
    validate_id(&session_id, "INVALID_ID", "session id")?;

    let existing = repositories::sessions::find_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"))?;

    let status = match payload.status.as_deref() {
        Some(raw) => Some(parse_session_status(raw)?),
        None => None,
    };
    let cheating_score = match payload.cheating_score {
        Some(raw) => Some(validate_cheating_score(raw)?),
        None => None,
    };
    let tab_switches = match payload.tab_switches {
        Some(raw) => Some(validate_tab_switches(raw)?),
        None => None,
    };

    let touches_lifecycle =
        status.is_some() || cheating_score.is_some() || tab_switches.is_some();
    if existing.status.is_terminal() && touches_lifecycle {
        return Err(ApiError::conflict(
            "INVALID_STATE_TRANSITION",
            "Exam session is already terminal",
        ));
    }

    match status {
        Some(new_status) if new_status.is_terminal() => {
            // Terminal transition through update: ended_at is stamped
            // exactly once, here.
            repositories::sessions::finish(
                state.db(),
                &session_id,
                new_status,
                cheating_score.unwrap_or(existing.cheating_score),
                primitive_now_utc(),
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to finish exam session"))?;

            if let Some(tab_switches) = tab_switches {
                repositories::sessions::update_fields(
                    state.db(),
                    &session_id,
                    repositories::sessions::UpdateSession {
                        status: None,
                        cheating_score: None,
                        tab_switches: Some(tab_switches),
                    },
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to update exam session"))?;
            }
        }
        _ => {
            repositories::sessions::update_fields(
                state.db(),
                &session_id,
                repositories::sessions::UpdateSession { status, cheating_score, tab_switches },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update exam session"))?;
        }
    }

    let updated = repositories::sessions::fetch_one_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam session"))?;

    Ok(Json(SessionResponse::from_db(updated)))
}

async fn delete_session(
    Path(session_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&session_id, "INVALID_ID", "session id")?;

    let deleted = repositories::sessions::delete(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam session"))?;

    if !deleted {
        return Err(ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"));
    }

    tracing::info!(
        admin_id = %admin.id,
        session_id = %session_id,
        action = "session_delete",
        "Admin deleted exam session"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// One transaction moves the counter, appends the matching tab_switch
/// violation and recomputes the score, so the counter and the log
/// cannot drift apart.
async fn record_tab_switch(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<TabSwitchResponse>, ApiError> {
    validate_id(&session_id, "INVALID_ID", "session id")?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let session = repositories::sessions::fetch_for_update(&mut *tx, &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"))?;

    require_session_access(&user, &session.student_id)?;

    if session.status.is_terminal() {
        return Err(ApiError::conflict(
            "INVALID_STATE_TRANSITION",
            "Exam session is already terminal",
        ));
    }

    let tab_switches = repositories::sessions::increment_tab_switches(&mut *tx, &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to increment tab switches"))?;

    let violation = repositories::violations::create(
        &mut *tx,
        repositories::violations::CreateViolation {
            id: &Uuid::new_v4().to_string(),
            session_id: Some(&session_id),
            violation_type: ViolationType::TabSwitch,
            severity: risk::tab_switch_severity(tab_switches as i64),
            occurred_at: primitive_now_utc(),
            snapshot_url: None,
            description: "Student switched away from the exam tab",
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record tab switch violation"))?;

    risk::rescore_session(&mut *tx, state.settings().risk(), &session)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to rescore exam session"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let updated = repositories::sessions::fetch_one_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam session"))?;

    Ok(Json(TabSwitchResponse {
        session: SessionResponse::from_db(updated),
        recorded_violation_id: violation.id,
    }))
}

/// Submission is the externally triggered exit from `active`: the score
/// is recomputed one final time and the threshold decides between
/// `completed` and `flagged`.
async fn submit_session(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    validate_id(&session_id, "INVALID_ID", "session id")?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let session = repositories::sessions::fetch_for_update(&mut *tx, &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::not_found("SESSION_NOT_FOUND", "Exam session not found"))?;

    require_session_access(&user, &session.student_id)?;

    if session.status.is_terminal() {
        return Err(ApiError::conflict(
            "INVALID_STATE_TRANSITION",
            "Exam session is already terminal",
        ));
    }

    let settings = state.settings().risk();
    let severities =
        repositories::violations::list_severities_for_session(&mut *tx, &session_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load session violations"))?;
    let plagiarism =
        repositories::plagiarism_checks::latest_score_for_session(&mut *tx, &session_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load plagiarism score"))?;

    let score = risk::compute_score(settings, &severities, plagiarism);
    let flagged = risk::should_flag(settings, score);
    let status = if flagged { SessionStatus::Flagged } else { SessionStatus::Completed };

    repositories::sessions::finish(&mut *tx, &session_id, status, score, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to finish exam session"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("exam_sessions_submitted_total").increment(1);
    if flagged {
        tracing::warn!(
            session_id = %session_id,
            score,
            "Session flagged at submission"
        );
    }

    let updated = repositories::sessions::fetch_one_by_id(state.db(), &session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam session"))?;

    Ok(Json(SubmitResponse { session: SessionResponse::from_db(updated), flagged }))
}
