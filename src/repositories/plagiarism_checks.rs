use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::PlagiarismCheck;
use crate::db::types::AnalysisMethod;

const COLUMNS: &str = "\
    id, session_id, file_name, file_url, plagiarism_score, matched_sources, \
    analysis_method, checked_at";

pub(crate) struct CreatePlagiarismCheck<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: Option<&'a str>,
    pub(crate) file_name: &'a str,
    pub(crate) file_url: &'a str,
    pub(crate) plagiarism_score: i32,
    pub(crate) matched_sources: serde_json::Value,
    pub(crate) analysis_method: AnalysisMethod,
    pub(crate) checked_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreatePlagiarismCheck<'_>,
) -> Result<PlagiarismCheck, sqlx::Error> {
    sqlx::query_as::<_, PlagiarismCheck>(&format!(
        "INSERT INTO plagiarism_checks (
            id, session_id, file_name, file_url, plagiarism_score, matched_sources,
            analysis_method, checked_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.file_name)
    .bind(params.file_url)
    .bind(params.plagiarism_score)
    .bind(params.matched_sources)
    .bind(params.analysis_method)
    .bind(params.checked_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<PlagiarismCheck>, sqlx::Error> {
    sqlx::query_as::<_, PlagiarismCheck>(&format!(
        "SELECT {COLUMNS} FROM plagiarism_checks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    session_id: Option<&str>,
    analysis_method: Option<AnalysisMethod>,
    offset: i64,
    limit: i64,
) -> Result<Vec<PlagiarismCheck>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM plagiarism_checks WHERE TRUE"
    ));

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    if let Some(analysis_method) = analysis_method {
        builder.push(" AND analysis_method = ");
        builder.push_bind(analysis_method);
    }

    builder.push(" ORDER BY checked_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<PlagiarismCheck>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    session_id: Option<&str>,
    analysis_method: Option<AnalysisMethod>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM plagiarism_checks WHERE TRUE");

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    if let Some(analysis_method) = analysis_method {
        builder.push(" AND analysis_method = ");
        builder.push_bind(analysis_method);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Newest check for a session; the scorer treats it as the session's
/// plagiarism estimate.
pub(crate) async fn latest_score_for_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT plagiarism_score FROM plagiarism_checks
         WHERE session_id = $1
         ORDER BY checked_at DESC
         LIMIT 1",
    )
    .bind(session_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_latest_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<PlagiarismCheck>, sqlx::Error> {
    sqlx::query_as::<_, PlagiarismCheck>(&format!(
        "SELECT {COLUMNS} FROM plagiarism_checks
         WHERE session_id = $1
         ORDER BY checked_at DESC
         LIMIT 1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM plagiarism_checks WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
