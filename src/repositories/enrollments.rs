use sqlx::PgPool;

use crate::db::models::ClassEnrollment;

const COLUMNS: &str = "id, class_id, student_id, enrolled_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EnrolledStudentRow {
    pub(crate) enrollment_id: String,
    pub(crate) student_id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EnrolledClassRow {
    pub(crate) enrollment_id: String,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
    pub(crate) class_id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
}

/// Conditional insert: the unique (class_id, student_id) index makes the
/// existence check and the write one atomic step, so two concurrent
/// identical joins cannot both succeed. Returns the enrollment when the
/// row was inserted, `None` when the pair already existed.
pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    class_id: &str,
    student_id: &str,
    enrolled_at: time::PrimitiveDateTime,
) -> Result<Option<ClassEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, ClassEnrollment>(&format!(
        "INSERT INTO class_enrollments (id, class_id, student_id, enrolled_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (class_id, student_id) DO NOTHING
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(class_id)
    .bind(student_id)
    .bind(enrolled_at)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_for_class_student(
    pool: &PgPool,
    class_id: &str,
    student_id: &str,
) -> Result<Option<ClassEnrollment>, sqlx::Error> {
    sqlx::query_as::<_, ClassEnrollment>(&format!(
        "SELECT {COLUMNS} FROM class_enrollments WHERE class_id = $1 AND student_id = $2",
    ))
    .bind(class_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_students_for_class(
    pool: &PgPool,
    class_id: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<EnrolledStudentRow>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudentRow>(
        "SELECT ce.id AS enrollment_id,
                u.id AS student_id,
                u.email,
                u.full_name,
                ce.enrolled_at
         FROM class_enrollments ce
         JOIN users u ON u.id = ce.student_id
         WHERE ce.class_id = $1
         ORDER BY ce.enrolled_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(class_id)
    .bind(offset.max(0))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_students_for_class(
    pool: &PgPool,
    class_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM class_enrollments WHERE class_id = $1")
        .bind(class_id)
        .fetch_one(pool)
        .await
}

/// Direct student -> classes index. One join keyed on the student,
/// instead of scanning every class's enrollment list.
pub(crate) async fn list_classes_for_student(
    pool: &PgPool,
    student_id: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<EnrolledClassRow>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledClassRow>(
        "SELECT ce.id AS enrollment_id,
                ce.enrolled_at,
                c.id AS class_id,
                c.name,
                c.code,
                c.description
         FROM class_enrollments ce
         JOIN classes c ON c.id = ce.class_id
         WHERE ce.student_id = $1
         ORDER BY ce.enrolled_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(student_id)
    .bind(offset.max(0))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_classes_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM class_enrollments WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn count_for_class_student(
    pool: &PgPool,
    class_id: &str,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM class_enrollments WHERE class_id = $1 AND student_id = $2",
    )
    .bind(class_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}
