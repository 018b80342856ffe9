use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ExamSession;
use crate::db::types::SessionStatus;
use crate::schemas::exam::ExamResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct SessionCreate {
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    /// Raw string so an unknown value surfaces as INVALID_STATUS rather
    /// than a generic deserialization failure.
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    #[serde(alias = "cheatingScore")]
    pub(crate) cheating_score: Option<i64>,
    #[serde(default)]
    #[serde(alias = "tabSwitches")]
    pub(crate) tab_switches: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionUpdate {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    #[serde(alias = "cheatingScore")]
    pub(crate) cheating_score: Option<i64>,
    #[serde(default)]
    #[serde(alias = "tabSwitches")]
    pub(crate) tab_switches: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinExamRequest {
    #[serde(default)]
    #[serde(alias = "classCode")]
    pub(crate) class_code: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: String,
    pub(crate) ended_at: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) cheating_score: i32,
    pub(crate) tab_switches: i32,
}

impl SessionResponse {
    pub(crate) fn from_db(session: ExamSession) -> Self {
        Self {
            id: session.id,
            exam_id: session.exam_id,
            student_id: session.student_id,
            started_at: format_primitive(session.started_at),
            ended_at: session.ended_at.map(format_primitive),
            status: session.status,
            cheating_score: session.cheating_score,
            tab_switches: session.tab_switches,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JoinExamResponse {
    pub(crate) session: SessionResponse,
    pub(crate) exam: ExamResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) session: SessionResponse,
    pub(crate) flagged: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TabSwitchResponse {
    pub(crate) session: SessionResponse,
    pub(crate) recorded_violation_id: String,
}
