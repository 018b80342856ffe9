use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

/// Every failure carries a machine-readable code alongside the human
/// detail so clients can branch without string matching.
#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden { code: &'static str, detail: &'static str },
    BadRequest { code: &'static str, detail: String },
    NotFound { code: &'static str, detail: String },
    Conflict { code: &'static str, detail: String },
    Internal { code: &'static str, detail: String },
}

impl ApiError {
    pub(crate) fn bad_request(code: &'static str, detail: impl Into<String>) -> Self {
        Self::BadRequest { code, detail: detail.into() }
    }

    pub(crate) fn not_found(code: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound { code, detail: detail.into() }
    }

    pub(crate) fn conflict(code: &'static str, detail: impl Into<String>) -> Self {
        Self::Conflict { code, detail: detail.into() }
    }

    pub(crate) fn forbidden(code: &'static str, detail: &'static str) -> Self {
        Self::Forbidden { code, detail }
    }

    /// Log the underlying error with context and return an `Internal`
    /// variant that does not leak it.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal { code: "INTERNAL_ERROR", detail: context.to_string() }
    }

    pub(crate) fn internal_with_code(
        code: &'static str,
        err: impl std::fmt::Display,
        context: &str,
    ) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal { code, detail: context.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse {
                        status: status.as_u16(),
                        code: "UNAUTHORIZED",
                        detail: message.to_string(),
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden { code, detail } => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse {
                        status: status.as_u16(),
                        code,
                        detail: detail.to_string(),
                    }),
                )
                    .into_response()
            }
            ApiError::BadRequest { code, detail } => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), code, detail }))
                    .into_response()
            }
            ApiError::NotFound { code, detail } => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), code, detail }))
                    .into_response()
            }
            ApiError::Conflict { code, detail } => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), code, detail }))
                    .into_response()
            }
            ApiError::Internal { code, detail } => {
                tracing::error!(error = %detail, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), code, detail }))
                    .into_response()
            }
        }
    }
}
