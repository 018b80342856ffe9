use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AnalysisMethod, SessionStatus, UserRole, ViolationSeverity, ViolationType,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Class {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
    pub(crate) admin_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ClassEnrollment {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) student_id: String,
    pub(crate) enrolled_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Json<serde_json::Value>,
    pub(crate) class_code: String,
    pub(crate) class_id: Option<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) status: SessionStatus,
    pub(crate) cheating_score: i32,
    pub(crate) tab_switches: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Violation {
    pub(crate) id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) violation_type: ViolationType,
    pub(crate) severity: ViolationSeverity,
    pub(crate) occurred_at: PrimitiveDateTime,
    pub(crate) snapshot_url: Option<String>,
    pub(crate) description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PlagiarismCheck {
    pub(crate) id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) file_name: String,
    pub(crate) file_url: String,
    pub(crate) plagiarism_score: i32,
    pub(crate) matched_sources: Json<serde_json::Value>,
    pub(crate) analysis_method: AnalysisMethod,
    pub(crate) checked_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Report {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) generated_at: PrimitiveDateTime,
    pub(crate) summary: Json<serde_json::Value>,
    pub(crate) pdf_url: Option<String>,
}
