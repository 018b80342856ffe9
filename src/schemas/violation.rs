use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Violation;
use crate::db::types::{ViolationSeverity, ViolationType};

#[derive(Debug, Deserialize)]
pub(crate) struct ViolationCreate {
    #[serde(default)]
    #[serde(alias = "sessionId")]
    pub(crate) session_id: Option<String>,
    /// Raw strings so unknown members surface the specific enum error
    /// codes instead of a generic deserialization failure.
    #[serde(default)]
    #[serde(alias = "violationType")]
    pub(crate) violation_type: Option<String>,
    #[serde(default)]
    pub(crate) severity: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "snapshotUrl")]
    pub(crate) snapshot_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViolationUpdate {
    #[serde(default)]
    #[serde(alias = "violationType")]
    pub(crate) violation_type: Option<String>,
    #[serde(default)]
    pub(crate) severity: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "snapshotUrl")]
    pub(crate) snapshot_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ViolationResponse {
    pub(crate) id: String,
    pub(crate) session_id: Option<String>,
    pub(crate) violation_type: ViolationType,
    pub(crate) severity: ViolationSeverity,
    pub(crate) timestamp: String,
    pub(crate) snapshot_url: Option<String>,
    pub(crate) description: String,
}

impl ViolationResponse {
    pub(crate) fn from_db(violation: Violation) -> Self {
        Self {
            id: violation.id,
            session_id: violation.session_id,
            violation_type: violation.violation_type,
            severity: violation.severity,
            timestamp: format_primitive(violation.occurred_at),
            snapshot_url: violation.snapshot_url,
            description: violation.description,
        }
    }
}
