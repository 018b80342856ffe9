use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Report;
use crate::db::types::SessionStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportCreate {
    #[serde(default)]
    #[serde(alias = "sessionId")]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    pub(crate) summary: Option<serde_json::Value>,
    #[serde(default)]
    #[serde(alias = "pdfUrl")]
    pub(crate) pdf_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReportRequest {
    #[serde(default)]
    #[serde(alias = "sessionId")]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "pdfUrl")]
    pub(crate) pdf_url: Option<String>,
}

/// The persisted snapshot of a session at review time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ReportSummary {
    pub(crate) session_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) exam_duration_minutes: i32,
    pub(crate) elapsed_minutes: Option<i64>,
    pub(crate) status: SessionStatus,
    pub(crate) cheating_score: i32,
    pub(crate) risk_level: String,
    pub(crate) violations_count: i64,
    pub(crate) violations_by_type: BTreeMap<String, i64>,
    pub(crate) tab_switches: i32,
    pub(crate) plagiarism_score: Option<i32>,
    pub(crate) recommendations: Vec<String>,
    pub(crate) flagged_incidents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) generated_at: String,
    pub(crate) summary: serde_json::Value,
    pub(crate) pdf_url: Option<String>,
}

impl ReportResponse {
    pub(crate) fn from_db(report: Report) -> Self {
        Self {
            id: report.id,
            session_id: report.session_id,
            generated_at: format_primitive(report.generated_at),
            summary: report.summary.0,
            pdf_url: report.pdf_url,
        }
    }
}
