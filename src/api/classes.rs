use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_class_owner, CurrentAdmin, CurrentStudent, CurrentUser};
use crate::api::pagination::{clamp_window, default_limit, PaginatedResponse};
use crate::api::validation::validate_id;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::class::{
    ClassCreate, ClassResponse, ClassUpdate, EnrolledClassResponse, EnrolledStudentResponse,
    EnrollmentResponse, JoinClassRequest, JoinClassResponse,
};
use crate::schemas::exam::ExamResponse;
use crate::services::class_codes;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/enrolled", get(list_enrolled_classes))
        .route("/join", post(join_class))
        .route("/by-code/:code", get(lookup_by_code))
        .route(
            "/:class_id",
            get(get_class).patch(update_class).delete(delete_class),
        )
        .route("/:class_id/students", get(list_students))
        .route("/:class_id/exams", get(list_class_exams))
}

#[derive(Debug, Deserialize)]
struct ListClassesQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

async fn create_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassResponse>), ApiError> {
    if payload.admin_id.is_some() {
        return Err(ApiError::bad_request(
            "ADMIN_ID_NOT_ALLOWED",
            "Admin ID cannot be provided in request body",
        ));
    }

    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::bad_request(
            "INVALID_NAME",
            "Name is required and must be a non-empty string",
        ));
    }

    let code = class_codes::allocate_class_code(state.db()).await.map_err(|e| match e {
        class_codes::CodeError::SpaceExhausted(_) => ApiError::internal_with_code(
            "CODE_SPACE_EXHAUSTED",
            e,
            "Failed to allocate a unique class code",
        ),
        class_codes::CodeError::Store(err) => {
            ApiError::internal(err, "Failed to check class code uniqueness")
        }
    })?;

    let now = primitive_now_utc();
    let class = repositories::classes::create(
        state.db(),
        repositories::classes::CreateClass {
            id: &Uuid::new_v4().to_string(),
            name,
            code: &code,
            description: payload.description.as_deref().map(str::trim),
            admin_id: &admin.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create class"))?;

    Ok((StatusCode::CREATED, Json(ClassResponse::from_db(class))))
}

async fn list_classes(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListClassesQuery>,
) -> Result<Json<PaginatedResponse<ClassResponse>>, ApiError> {
    let (offset, limit) = clamp_window(query.offset, query.limit);
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let classes =
        repositories::classes::list(state.db(), Some(&admin.id), search, offset, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;
    let total_count = repositories::classes::count(state.db(), Some(&admin.id), search)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count classes"))?;

    Ok(Json(PaginatedResponse {
        items: classes.into_iter().map(ClassResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn lookup_by_code(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ClassResponse>, ApiError> {
    let normalized = class_codes::normalize_code(&code);
    if normalized.is_empty() {
        return Err(ApiError::bad_request("MISSING_CODE", "Class code is required"));
    }

    let class = repositories::classes::find_by_code(state.db(), &normalized)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class by code"))?
        .ok_or_else(|| ApiError::not_found("CLASS_NOT_FOUND", "Class not found with this code"))?;

    Ok(Json(ClassResponse::from_db(class)))
}

async fn get_class(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<ClassResponse>, ApiError> {
    validate_id(&class_id, "INVALID_ID", "class id")?;

    let class = repositories::classes::find_by_id(state.db(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::not_found("CLASS_NOT_FOUND", "Class not found"))?;

    Ok(Json(ClassResponse::from_db(class)))
}

async fn update_class(
    Path(class_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ClassUpdate>,
) -> Result<Json<ClassResponse>, ApiError> {
    validate_id(&class_id, "INVALID_ID", "class id")?;

    if payload.admin_id.is_some() {
        return Err(ApiError::bad_request(
            "ADMIN_ID_NOT_ALLOWED",
            "Admin ID cannot be provided in request body",
        ));
    }

    let existing = require_class_owner(&state, &admin, &class_id).await?;

    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("INVALID_NAME", "Name must be a non-empty string"));
        }
    }

    let code = match payload.code.as_deref() {
        Some(raw) => {
            if raw.len() != class_codes::CLASS_CODE_LEN {
                return Err(ApiError::bad_request(
                    "INVALID_CODE_LENGTH",
                    "Code must be exactly 6 characters",
                ));
            }

            let normalized = class_codes::normalize_code(raw);
            if normalized != existing.code {
                let taken = repositories::classes::find_by_code(state.db(), &normalized)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to check class code"))?;
                if taken.is_some() {
                    return Err(ApiError::conflict("CODE_NOT_UNIQUE", "Code already exists"));
                }
            }
            Some(normalized)
        }
        None => None,
    };

    repositories::classes::update(
        state.db(),
        &class_id,
        repositories::classes::UpdateClass {
            name: payload.name.map(|name| name.trim().to_string()),
            description: payload.description.map(|description| description.trim().to_string()),
            code,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update class"))?;

    let updated = repositories::classes::fetch_one_by_id(state.db(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated class"))?;

    Ok(Json(ClassResponse::from_db(updated)))
}

async fn delete_class(
    Path(class_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    validate_id(&class_id, "INVALID_ID", "class id")?;

    require_class_owner(&state, &admin, &class_id).await?;

    let deleted = repositories::classes::delete(state.db(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete class"))?;

    if !deleted {
        return Err(ApiError::not_found("CLASS_NOT_FOUND", "Class not found"));
    }

    tracing::info!(
        admin_id = %admin.id,
        class_id = %class_id,
        action = "class_delete",
        "Admin deleted class"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn join_class(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<JoinClassRequest>,
) -> Result<(StatusCode, Json<JoinClassResponse>), ApiError> {
    let Some(raw_code) = payload.class_code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    else {
        return Err(ApiError::bad_request("MISSING_CLASS_CODE", "Class code is required"));
    };

    if raw_code.len() != class_codes::CLASS_CODE_LEN {
        return Err(ApiError::bad_request(
            "INVALID_CLASS_CODE_FORMAT",
            "Class code must be exactly 6 characters",
        ));
    }

    let normalized = class_codes::normalize_code(raw_code);
    let class = repositories::classes::find_by_code(state.db(), &normalized)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class by code"))?
        .ok_or_else(|| ApiError::not_found("CLASS_NOT_FOUND", "Class not found with this code"))?;

    let enrollment = repositories::enrollments::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &class.id,
        &student.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create enrollment"))?
    .ok_or_else(|| ApiError::conflict("ALREADY_ENROLLED", "Already enrolled in this class"))?;

    Ok((
        StatusCode::CREATED,
        Json(JoinClassResponse {
            enrollment: EnrollmentResponse::from_db(enrollment),
            class: ClassResponse::from_db(class),
        }),
    ))
}

async fn list_students(
    Path(class_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<EnrolledStudentResponse>>, ApiError> {
    validate_id(&class_id, "INVALID_ID", "class id")?;
    require_class_owner(&state, &admin, &class_id).await?;

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let rows =
        repositories::enrollments::list_students_for_class(state.db(), &class_id, offset, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list enrolled students"))?;
    let total_count =
        repositories::enrollments::count_students_for_class(state.db(), &class_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count enrolled students"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(EnrolledStudentResponse::from_row).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn list_enrolled_classes(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<EnrolledClassResponse>>, ApiError> {
    let (offset, limit) = clamp_window(query.offset, query.limit);

    let rows =
        repositories::enrollments::list_classes_for_student(state.db(), &student.id, offset, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list enrolled classes"))?;
    let total_count =
        repositories::enrollments::count_classes_for_student(state.db(), &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count enrolled classes"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(EnrolledClassResponse::from_row).collect(),
        total_count,
        offset,
        limit,
    }))
}

async fn list_class_exams(
    Path(class_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    validate_id(&class_id, "INVALID_ID", "class id")?;

    let class = repositories::classes::find_by_id(state.db(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?;
    if class.is_none() {
        return Err(ApiError::not_found("CLASS_NOT_FOUND", "Class not found"));
    }

    let (offset, limit) = clamp_window(query.offset, query.limit);
    let exams = repositories::exams::list(state.db(), Some(&class_id), offset, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count(state.db(), Some(&class_id))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: exams.into_iter().map(ExamResponse::from_db).collect(),
        total_count,
        offset,
        limit,
    }))
}
