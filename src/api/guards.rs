use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Class, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Admin {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::forbidden("ADMIN_ROLE_REQUIRED", "Admin role required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Student {
            Ok(CurrentStudent(user))
        } else {
            Err(ApiError::forbidden("STUDENT_ROLE_REQUIRED", "Student role required"))
        }
    }
}

/// Classes are mutable by their owning admin only.
pub(crate) async fn require_class_owner(
    state: &AppState,
    user: &User,
    class_id: &str,
) -> Result<Class, ApiError> {
    let class = repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::not_found("CLASS_NOT_FOUND", "Class not found"))?;

    if class.admin_id != user.id {
        return Err(ApiError::forbidden(
            "NOT_CLASS_ADMIN",
            "You are not authorized to manage this class",
        ));
    }

    Ok(class)
}

/// A student may only drive their own session; admins may drive any.
pub(crate) fn require_session_access(user: &User, session_student_id: &str) -> Result<(), ApiError> {
    if user.role == UserRole::Admin || user.id == session_student_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("NOT_SESSION_OWNER", "Not your exam session"))
    }
}
