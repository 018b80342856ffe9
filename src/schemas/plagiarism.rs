use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::PlagiarismCheck;
use crate::db::types::AnalysisMethod;

#[derive(Debug, Deserialize)]
pub(crate) struct PlagiarismCheckCreate {
    #[serde(default)]
    #[serde(alias = "sessionId")]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "fileName")]
    pub(crate) file_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "fileUrl")]
    pub(crate) file_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "plagiarismScore")]
    pub(crate) plagiarism_score: Option<i64>,
    #[serde(default)]
    #[serde(alias = "matchedSources")]
    pub(crate) matched_sources: Option<serde_json::Value>,
    #[serde(default)]
    #[serde(alias = "analysisMethod")]
    pub(crate) analysis_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceSource {
    pub(crate) source: String,
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    #[serde(default)]
    #[serde(alias = "sessionId")]
    pub(crate) session_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "fileName")]
    pub(crate) file_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "fileUrl")]
    pub(crate) file_url: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    #[serde(alias = "referenceSources")]
    pub(crate) reference_sources: Vec<ReferenceSource>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlagiarismCheckResponse {
    pub(crate) id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) file_name: String,
    pub(crate) file_url: String,
    pub(crate) plagiarism_score: i32,
    pub(crate) matched_sources: serde_json::Value,
    pub(crate) analysis_method: AnalysisMethod,
    pub(crate) checked_at: String,
}

impl PlagiarismCheckResponse {
    pub(crate) fn from_db(check: PlagiarismCheck) -> Self {
        Self {
            id: check.id,
            session_id: check.session_id,
            file_name: check.file_name,
            file_url: check.file_url,
            plagiarism_score: check.plagiarism_score,
            matched_sources: check.matched_sources.0,
            analysis_method: check.analysis_method,
            checked_at: format_primitive(check.checked_at),
        }
    }
}
