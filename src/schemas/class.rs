use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{Class, ClassEnrollment};
use crate::repositories::enrollments::{EnrolledClassRow, EnrolledStudentRow};

#[derive(Debug, Deserialize)]
pub(crate) struct ClassCreate {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// The owner always comes from the auth context; a body-supplied
    /// admin id is rejected outright.
    #[serde(default)]
    #[serde(alias = "adminId")]
    pub(crate) admin_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassUpdate {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[serde(alias = "adminId")]
    pub(crate) admin_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinClassRequest {
    #[serde(default)]
    #[serde(alias = "classCode")]
    pub(crate) class_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
    pub(crate) admin_id: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ClassResponse {
    pub(crate) fn from_db(class: Class) -> Self {
        Self {
            id: class.id,
            name: class.name,
            code: class.code,
            description: class.description,
            admin_id: class.admin_id,
            created_at: format_primitive(class.created_at),
            updated_at: format_primitive(class.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) student_id: String,
    pub(crate) enrolled_at: String,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: ClassEnrollment) -> Self {
        Self {
            id: enrollment.id,
            class_id: enrollment.class_id,
            student_id: enrollment.student_id,
            enrolled_at: format_primitive(enrollment.enrolled_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JoinClassResponse {
    pub(crate) enrollment: EnrollmentResponse,
    pub(crate) class: ClassResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledStudentResponse {
    pub(crate) enrollment_id: String,
    pub(crate) student_id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) enrolled_at: String,
}

impl EnrolledStudentResponse {
    pub(crate) fn from_row(row: EnrolledStudentRow) -> Self {
        Self {
            enrollment_id: row.enrollment_id,
            student_id: row.student_id,
            email: row.email,
            full_name: row.full_name,
            enrolled_at: format_primitive(row.enrolled_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledClassResponse {
    pub(crate) enrollment_id: String,
    pub(crate) class_id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
    pub(crate) enrolled_at: String,
}

impl EnrolledClassResponse {
    pub(crate) fn from_row(row: EnrolledClassRow) -> Self {
        Self {
            enrollment_id: row.enrollment_id,
            class_id: row.class_id,
            name: row.name,
            code: row.code,
            description: row.description,
            enrolled_at: format_primitive(row.enrolled_at),
        }
    }
}
