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
use crate::api::validation::{validate_duration_minutes, validate_id, validate_questions};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{SessionStatus, UserRole};
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse, ExamUpdate};
use crate::schemas::session::{JoinExamRequest, JoinExamResponse, SessionResponse};
use crate::services::class_codes;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/join-with-code", post(join_with_code))
        .route("/by-code/:code", get(lookup_by_code))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
}

#[derive(Debug, Deserialize)]
struct ListExamsQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "classId")]
    class_id: Option<String>,
}

async fn create_exam(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    let Some(title) = payload.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("MISSING_TITLE", "Title is required"));
    };

    let Some(raw_duration) = payload.duration_minutes else {
        return Err(ApiError::bad_request("MISSING_DURATION", "Duration in minutes is required"));
    };
    let duration_minutes = validate_duration_minutes(raw_duration)?;

    let Some(questions_value) = payload.questions.as_ref() else {
        return Err(ApiError::bad_request("MISSING_QUESTIONS", "Questions are required"));
    };
    validate_questions(questions_value)?;

    let Some(raw_code) =
        payload.class_code.as_deref().map(str::trim).filter(|code| !code.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_CLASS_CODE", "Class code is required"));
    };
    let class_code = class_codes::normalize_code(raw_code);

    let taken = repositories::exams::class_code_taken(state.db(), &class_code, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam code uniqueness"))?;
    if taken {
        return Err(ApiError::conflict("CLASS_CODE_EXISTS", "Class code already exists"));
    }

    let class_id = match payload.class_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(class_id) => {
            validate_id(class_id, "INVALID_CLASS_ID", "class id")?;
            let class = repositories::classes::find_by_id(state.db(), class_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?;
            if class.is_none() {
                return Err(ApiError::not_found("CLASS_NOT_FOUND", "Class not found"));
            }
            Some(class_id.to_string())
        }
        None => None,
    };

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title,
            description: payload.description.as_deref().map(str::trim),
            duration_minutes,
            questions: questions_value.clone(),
            class_code: &class_code,
            class_id: class_id.as_deref(),
            created_by: Some(&admin.id),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

async fn list_exams(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListExamsQuery>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    let class_id = match query.class_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(class_id) => {
            validate_id(class_id, "INVALID_CLASS_ID", "class id")?;
            Some(class_id.to_string())
        }
        None => None,
    };

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let exams = repositories::exams::list(state.db(), class_id.as_deref(), offset, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count(state.db(), class_id.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: exams.into_iter().map(ExamResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn lookup_by_code(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ExamResponse>, ApiError> {
    let normalized = class_codes::normalize_code(&code);
    if normalized.is_empty() {
        return Err(ApiError::bad_request("MISSING_CLASS_CODE", "Class code is required"));
    }

    let exam = repositories::exams::find_by_class_code(state.db(), &normalized)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam by code"))?
        .ok_or_else(|| {
            ApiError::not_found("EXAM_NOT_FOUND", "Exam not found with this class code")
        })?;

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn get_exam(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamResponse>, ApiError> {
    validate_id(&exam_id, "INVALID_ID", "exam id")?;

    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::not_found("EXAM_NOT_FOUND", "Exam not found"))?;

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    validate_id(&exam_id, "INVALID_ID", "exam id")?;

    let existing = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::not_found("EXAM_NOT_FOUND", "Exam not found"))?;

    if let Some(title) = payload.title.as_deref() {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("MISSING_TITLE", "Title must not be empty"));
        }
    }

    let duration_minutes = match payload.duration_minutes {
        Some(raw) => Some(validate_duration_minutes(raw)?),
        None => None,
    };

    if let Some(questions_value) = payload.questions.as_ref() {
        validate_questions(questions_value)?;
    }

    // Exam code uniqueness is re-validated on update, excluding the
    // record being updated.
    let class_code = match payload.class_code.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ApiError::bad_request(
                    "INVALID_CLASS_CODE",
                    "Class code cannot be empty",
                ));
            }
            let normalized = class_codes::normalize_code(trimmed);
            if normalized != existing.class_code {
                let taken = repositories::exams::class_code_taken(
                    state.db(),
                    &normalized,
                    Some(&exam_id),
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check exam code uniqueness"))?;
                if taken {
                    return Err(ApiError::conflict(
                        "CLASS_CODE_EXISTS",
                        "Class code already exists",
                    ));
                }
            }
            Some(normalized)
        }
        None => None,
    };

    repositories::exams::update(
        state.db(),
        &exam_id,
        repositories::exams::UpdateExam {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description.map(|description| description.trim().to_string()),
            duration_minutes,
            questions: payload.questions,
            class_code,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    Ok(Json(ExamResponse::from_db(updated)))
}

async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&exam_id, "INVALID_ID", "exam id")?;

    let deleted = repositories::exams::delete(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    if !deleted {
        return Err(ApiError::not_found("EXAM_NOT_FOUND", "Exam not found"));
    }

    tracing::info!(
        admin_id = %admin.id,
        exam_id = %exam_id,
        action = "exam_delete",
        "Admin deleted exam"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Joining an exam by code creates the proctored session in `active`
/// state. The unique (exam, student) index rejects a second join
/// without overwriting the first attempt.
async fn join_with_code(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<JoinExamRequest>,
) -> Result<(StatusCode, Json<JoinExamResponse>), ApiError> {
    let Some(raw_code) =
        payload.class_code.as_deref().map(str::trim).filter(|code| !code.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_CLASS_CODE", "Class code is required"));
    };

    let Some(student_id) =
        payload.student_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_STUDENT_ID", "Student ID is required"));
    };
    validate_id(student_id, "INVALID_STUDENT_ID", "student id")?;

    // Students may only open sessions for themselves; admins may open
    // one on a student's behalf.
    if user.role == UserRole::Student && user.id != student_id {
        return Err(ApiError::forbidden("NOT_SESSION_OWNER", "Not your exam session"));
    }

    let normalized = class_codes::normalize_code(raw_code);
    let exam = repositories::exams::find_by_class_code(state.db(), &normalized)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam by code"))?
        .ok_or_else(|| {
            ApiError::not_found("EXAM_NOT_FOUND", "Exam not found with this class code")
        })?;

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
            exam_id: &exam.id,
            student_id,
            started_at: primitive_now_utc(),
            status: SessionStatus::Active,
            cheating_score: 0,
            tab_switches: 0,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam session"))?
    .ok_or_else(|| {
        ApiError::conflict("SESSION_ALREADY_EXISTS", "Student already has a session for this exam")
    })?;

    metrics::counter!("exam_sessions_started_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(JoinExamResponse {
            session: SessionResponse::from_db(session),
            exam: ExamResponse::from_db(exam),
        }),
    ))
}

#[cfg(test)]
mod tests;
