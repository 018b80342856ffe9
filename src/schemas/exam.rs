use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Exam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    ShortAnswer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(alias = "question")]
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    pub(crate) points: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamCreate {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    pub(crate) duration_minutes: Option<i64>,
    #[serde(default)]
    pub(crate) questions: Option<serde_json::Value>,
    #[serde(default)]
    #[serde(alias = "classCode")]
    pub(crate) class_code: Option<String>,
    #[serde(default)]
    #[serde(alias = "classId")]
    pub(crate) class_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    pub(crate) duration_minutes: Option<i64>,
    #[serde(default)]
    pub(crate) questions: Option<serde_json::Value>,
    #[serde(default)]
    #[serde(alias = "classCode")]
    pub(crate) class_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: serde_json::Value,
    pub(crate) class_code: String,
    pub(crate) class_id: Option<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            questions: exam.questions.0,
            class_code: exam.class_code,
            class_id: exam.class_id,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}
