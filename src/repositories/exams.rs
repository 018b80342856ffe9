use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Exam;

const COLUMNS: &str = "\
    id, title, description, duration_minutes, questions, class_code, \
    class_id, created_by, created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: serde_json::Value,
    pub(crate) class_code: &'a str,
    pub(crate) class_id: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateExam {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) questions: Option<serde_json::Value>,
    pub(crate) class_code: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, duration_minutes, questions, class_code,
            class_id, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.duration_minutes)
    .bind(params.questions)
    .bind(params.class_code)
    .bind(params.class_id)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Exam codes are stored upper-case; callers normalize before lookup.
pub(crate) async fn find_by_class_code(
    pool: &PgPool,
    class_code: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE class_code = $1"))
        .bind(class_code)
        .fetch_optional(pool)
        .await
}

/// Uniqueness probe for updates: ignores the record being updated.
pub(crate) async fn class_code_taken(
    pool: &PgPool,
    class_code: &str,
    excluding_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams WHERE class_code = ");
    builder.push_bind(class_code);

    if let Some(excluding_id) = excluding_id {
        builder.push(" AND id <> ");
        builder.push_bind(excluding_id);
    }

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count > 0)
}

pub(crate) async fn list(
    pool: &PgPool,
    class_id: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams WHERE TRUE"));

    if let Some(class_id) = class_id {
        builder.push(" AND class_id = ");
        builder.push_bind(class_id);
    }

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, class_id: Option<&str>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams WHERE TRUE");

    if let Some(class_id) = class_id {
        builder.push(" AND class_id = ");
        builder.push_bind(class_id);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn update(pool: &PgPool, id: &str, params: UpdateExam) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            duration_minutes = COALESCE($3, duration_minutes),
            questions = COALESCE($4, questions),
            class_code = COALESCE($5, class_code),
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.duration_minutes)
    .bind(params.questions)
    .bind(params.class_code)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
