use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Report;

const COLUMNS: &str = "id, session_id, generated_at, summary, pdf_url";

pub(crate) struct CreateReport<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) generated_at: time::PrimitiveDateTime,
    pub(crate) summary: serde_json::Value,
    pub(crate) pdf_url: Option<&'a str>,
}

pub(crate) async fn create(pool: &PgPool, params: CreateReport<'_>) -> Result<Report, sqlx::Error> {
    sqlx::query_as::<_, Report>(&format!(
        "INSERT INTO reports (id, session_id, generated_at, summary, pdf_url)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.generated_at)
    .bind(params.summary)
    .bind(params.pdf_url)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(&format!("SELECT {COLUMNS} FROM reports WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    session_id: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Report>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM reports WHERE TRUE"));

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    builder.push(" ORDER BY generated_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<Report>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, session_id: Option<&str>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports WHERE TRUE");

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reports WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
