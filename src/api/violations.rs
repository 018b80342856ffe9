use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{clamp_window, default_limit, PaginatedResponse};
use crate::api::validation::{parse_severity, parse_violation_type, validate_id};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::violation::{ViolationCreate, ViolationResponse, ViolationUpdate};
use crate::services::risk;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_violations).post(record_violation))
        .route(
            "/:violation_id",
            get(get_violation).put(update_violation).delete(delete_violation),
        )
}

#[derive(Debug, Deserialize)]
struct ListViolationsQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "violationType")]
    violation_type: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

/// Append a monitoring event. When the event is attached to a session
/// the scorer reruns inside the same transaction, so the stored score
/// is never stale relative to the log.
async fn record_violation(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ViolationCreate>,
) -> Result<(StatusCode, Json<ViolationResponse>), ApiError> {
    let Some(raw_type) = payload.violation_type.as_deref().map(str::trim).filter(|v| !v.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_VIOLATION_TYPE", "Violation type is required"));
    };
    let violation_type = parse_violation_type(raw_type)?;

    let Some(raw_severity) = payload.severity.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_SEVERITY", "Severity is required"));
    };
    let severity = parse_severity(raw_severity)?;

    let Some(description) =
        payload.description.as_deref().map(str::trim).filter(|d| !d.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_DESCRIPTION", "Description is required"));
    };

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

    // Referential integrity is enforced: an attached event must point
    // at a real session.
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

    let violation = repositories::violations::create(
        &mut *tx,
        repositories::violations::CreateViolation {
            id: &Uuid::new_v4().to_string(),
            session_id: session_id.as_deref(),
            violation_type,
            severity,
            occurred_at: primitive_now_utc(),
            snapshot_url: payload.snapshot_url.as_deref(),
            description,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record violation"))?;

    if let Some(session) = session.as_ref() {
        let rescore = risk::rescore_session(&mut *tx, state.settings().risk(), session)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to rescore exam session"))?;
        if rescore.flagged {
            tracing::warn!(
                session_id = %session.id,
                score = rescore.score,
                "Session flagged after recorded violation"
            );
        }
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!(
        "violations_recorded_total",
        "type" => violation_type.as_str()
    )
    .increment(1);

    Ok((StatusCode::CREATED, Json(ViolationResponse::from_db(violation))))
}

async fn list_violations(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListViolationsQuery>,
) -> Result<Json<PaginatedResponse<ViolationResponse>>, ApiError> {
    let session_id = match query.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    {
        Some(session_id) => {
            validate_id(session_id, "INVALID_SESSION_ID", "session id")?;
            Some(session_id.to_string())
        }
        None => None,
    };
    let violation_type = match query.violation_type.as_deref() {
        Some(raw) => Some(parse_violation_type(raw)?),
        None => None,
    };
    let severity = match query.severity.as_deref() {
        Some(raw) => Some(parse_severity(raw)?),
        None => None,
    };

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let violations = repositories::violations::list(
        state.db(),
        session_id.as_deref(),
        violation_type,
        severity,
        offset,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list violations"))?;
    let total_count = repositories::violations::count(
        state.db(),
        session_id.as_deref(),
        violation_type,
        severity,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count violations"))?;

    Ok(Json(PaginatedResponse {
        items: violations.into_iter().map(ViolationResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn get_violation(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(violation_id): Path<String>,
) -> Result<Json<ViolationResponse>, ApiError> {
    validate_id(&violation_id, "INVALID_ID", "violation id")?;

    let violation = repositories::violations::find_by_id(state.db(), &violation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch violation"))?
        .ok_or_else(|| ApiError::not_found("VIOLATION_NOT_FOUND", "Violation not found"))?;

    Ok(Json(ViolationResponse::from_db(violation)))
}

/// Corrective edits exist but are disabled unless explicitly turned on;
/// the hot path treats the log as append-only.
async fn update_violation(
    Path(violation_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ViolationUpdate>,
) -> Result<Json<ViolationResponse>, ApiError> {
    if !state.settings().monitoring().violation_edits_enabled {
        return Err(ApiError::forbidden(
            "VIOLATION_EDITS_DISABLED",
            "Violation editing is disabled",
        ));
    }

    validate_id(&violation_id, "INVALID_ID", "violation id")?;

    let existing = repositories::violations::find_by_id(state.db(), &violation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch violation"))?
        .ok_or_else(|| ApiError::not_found("VIOLATION_NOT_FOUND", "Violation not found"))?;

    let violation_type = match payload.violation_type.as_deref() {
        Some(raw) => Some(parse_violation_type(raw)?),
        None => None,
    };
    let severity = match payload.severity.as_deref() {
        Some(raw) => Some(parse_severity(raw)?),
        None => None,
    };
    if let Some(description) = payload.description.as_deref() {
        if description.trim().is_empty() {
            return Err(ApiError::bad_request(
                "MISSING_DESCRIPTION",
                "Description must not be empty",
            ));
        }
    }

    repositories::violations::update(
        state.db(),
        &violation_id,
        repositories::violations::UpdateViolation {
            violation_type,
            severity,
            description: payload.description.map(|description| description.trim().to_string()),
            snapshot_url: payload.snapshot_url,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update violation"))?;

    // A severity edit changes the aggregate; rescore the attached
    // session if it is still active.
    rescore_attached_session(&state, existing.session_id.as_deref()).await?;

    let updated = repositories::violations::find_by_id(state.db(), &violation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated violation"))?
        .ok_or_else(|| ApiError::not_found("VIOLATION_NOT_FOUND", "Violation not found"))?;

    Ok(Json(ViolationResponse::from_db(updated)))
}

async fn delete_violation(
    Path(violation_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&violation_id, "INVALID_ID", "violation id")?;

    let existing = repositories::violations::find_by_id(state.db(), &violation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch violation"))?
        .ok_or_else(|| ApiError::not_found("VIOLATION_NOT_FOUND", "Violation not found"))?;

    repositories::violations::delete(state.db(), &violation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete violation"))?;

    rescore_attached_session(&state, existing.session_id.as_deref()).await?;

    tracing::info!(
        admin_id = %admin.id,
        violation_id = %violation_id,
        action = "violation_delete",
        "Admin deleted violation"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn rescore_attached_session(
    state: &AppState,
    session_id: Option<&str>,
) -> Result<(), ApiError> {
    let Some(session_id) = session_id else {
        return Ok(());
    };

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let session = repositories::sessions::fetch_for_update(&mut *tx, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?;

    if let Some(session) = session.as_ref() {
        risk::rescore_session(&mut *tx, state.settings().risk(), session)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to rescore exam session"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))
}

#[cfg(test)]
mod tests;
