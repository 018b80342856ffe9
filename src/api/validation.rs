use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::db::types::{AnalysisMethod, SessionStatus, ViolationSeverity, ViolationType};
use crate::schemas::exam::{Question, QuestionType};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

/// Record ids are UUID strings; anything else is rejected with the
/// caller-supplied code before touching the store.
pub(crate) fn validate_id(value: &str, code: &'static str, what: &str) -> Result<(), ApiError> {
    if Uuid::parse_str(value.trim()).is_ok() {
        Ok(())
    } else {
        Err(ApiError::bad_request(code, format!("Valid {what} is required")))
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    let trimmed = email.trim();
    let valid = trimmed.len() <= 320
        && trimmed.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("INVALID_EMAIL", "A valid email address is required"))
    }
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "INVALID_PASSWORD",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        ))
    }
}

pub(crate) fn parse_session_status(raw: &str) -> Result<SessionStatus, ApiError> {
    match raw {
        "active" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "flagged" => Ok(SessionStatus::Flagged),
        _ => Err(ApiError::bad_request(
            "INVALID_STATUS",
            "Invalid status. Must be one of: active, completed, flagged",
        )),
    }
}

pub(crate) fn parse_violation_type(raw: &str) -> Result<ViolationType, ApiError> {
    match raw {
        "multiple_faces" => Ok(ViolationType::MultipleFaces),
        "phone_detected" => Ok(ViolationType::PhoneDetected),
        "tab_switch" => Ok(ViolationType::TabSwitch),
        "no_face" => Ok(ViolationType::NoFace),
        _ => Err(ApiError::bad_request(
            "INVALID_VIOLATION_TYPE",
            "Invalid violation type. Must be one of: multiple_faces, phone_detected, tab_switch, no_face",
        )),
    }
}

pub(crate) fn parse_severity(raw: &str) -> Result<ViolationSeverity, ApiError> {
    match raw {
        "low" => Ok(ViolationSeverity::Low),
        "medium" => Ok(ViolationSeverity::Medium),
        "high" => Ok(ViolationSeverity::High),
        _ => Err(ApiError::bad_request(
            "INVALID_SEVERITY",
            "Invalid severity. Must be one of: low, medium, high",
        )),
    }
}

pub(crate) fn parse_analysis_method(raw: &str) -> Result<AnalysisMethod, ApiError> {
    match raw {
        "tf-idf" => Ok(AnalysisMethod::TfIdf),
        "cosine" => Ok(AnalysisMethod::Cosine),
        "gpt" => Ok(AnalysisMethod::Gpt),
        _ => Err(ApiError::bad_request(
            "INVALID_ANALYSIS_METHOD",
            "Invalid analysis method. Must be one of: tf-idf, cosine, gpt",
        )),
    }
}

/// Scores are rejected when out of range, never clamped, so a broken
/// caller is surfaced instead of masked.
pub(crate) fn validate_cheating_score(value: i64) -> Result<i32, ApiError> {
    if (0..=100).contains(&value) {
        Ok(value as i32)
    } else {
        Err(ApiError::bad_request(
            "INVALID_CHEATING_SCORE",
            "Invalid cheatingScore. Must be an integer between 0 and 100",
        ))
    }
}

pub(crate) fn validate_tab_switches(value: i64) -> Result<i32, ApiError> {
    if (0..=i32::MAX as i64).contains(&value) {
        Ok(value as i32)
    } else {
        Err(ApiError::bad_request(
            "INVALID_TAB_SWITCHES",
            "Invalid tabSwitches. Must be a non-negative integer",
        ))
    }
}

pub(crate) fn validate_plagiarism_score(value: i64) -> Result<i32, ApiError> {
    if (0..=100).contains(&value) {
        Ok(value as i32)
    } else {
        Err(ApiError::bad_request(
            "INVALID_PLAGIARISM_SCORE",
            "plagiarismScore must be between 0 and 100",
        ))
    }
}

pub(crate) fn validate_duration_minutes(value: i64) -> Result<i32, ApiError> {
    if (1..=i32::MAX as i64).contains(&value) {
        Ok(value as i32)
    } else {
        Err(ApiError::bad_request("INVALID_DURATION", "Duration must be a positive integer"))
    }
}

/// Questions arrive as raw JSON; deserializing into the typed records
/// is the validation. Each multiple-choice question needs at least two
/// options, every question a non-empty prompt and a positive point
/// value.
pub(crate) fn validate_questions(value: &serde_json::Value) -> Result<Vec<Question>, ApiError> {
    let invalid =
        || ApiError::bad_request("INVALID_QUESTIONS", "Questions must be a valid array");

    if !value.is_array() {
        return Err(invalid());
    }

    let questions: Vec<Question> =
        serde_json::from_value(value.clone()).map_err(|_| invalid())?;

    for question in &questions {
        if question.prompt.trim().is_empty() || question.points <= 0 {
            return Err(invalid());
        }
        if question.question_type == QuestionType::MultipleChoice
            && question.options.as_ref().map_or(true, |options| options.len() < 2)
        {
            return Err(invalid());
        }
    }

    Ok(questions)
}
