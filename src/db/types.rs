use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sessionstatus", rename_all = "lowercase")]
pub(crate) enum SessionStatus {
    Active,
    Completed,
    Flagged,
}

impl SessionStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Flagged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "violationtype", rename_all = "snake_case")]
pub(crate) enum ViolationType {
    MultipleFaces,
    PhoneDetected,
    TabSwitch,
    NoFace,
}

impl ViolationType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::MultipleFaces => "multiple_faces",
            Self::PhoneDetected => "phone_detected",
            Self::TabSwitch => "tab_switch",
            Self::NoFace => "no_face",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "violationseverity", rename_all = "lowercase")]
pub(crate) enum ViolationSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "analysismethod", rename_all = "kebab-case")]
pub(crate) enum AnalysisMethod {
    TfIdf,
    Cosine,
    Gpt,
}
