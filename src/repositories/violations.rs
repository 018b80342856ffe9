use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Violation;
use crate::db::types::{ViolationSeverity, ViolationType};

const COLUMNS: &str = "\
    id, session_id, violation_type, severity, occurred_at, snapshot_url, description";

pub(crate) struct CreateViolation<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: Option<&'a str>,
    pub(crate) violation_type: ViolationType,
    pub(crate) severity: ViolationSeverity,
    pub(crate) occurred_at: time::PrimitiveDateTime,
    pub(crate) snapshot_url: Option<&'a str>,
    pub(crate) description: &'a str,
}

pub(crate) struct UpdateViolation {
    pub(crate) violation_type: Option<ViolationType>,
    pub(crate) severity: Option<ViolationSeverity>,
    pub(crate) description: Option<String>,
    pub(crate) snapshot_url: Option<String>,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateViolation<'_>,
) -> Result<Violation, sqlx::Error> {
    sqlx::query_as::<_, Violation>(&format!(
        "INSERT INTO violations (
            id, session_id, violation_type, severity, occurred_at, snapshot_url, description
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.violation_type)
    .bind(params.severity)
    .bind(params.occurred_at)
    .bind(params.snapshot_url)
    .bind(params.description)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Violation>, sqlx::Error> {
    sqlx::query_as::<_, Violation>(&format!("SELECT {COLUMNS} FROM violations WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    session_id: Option<&str>,
    violation_type: Option<ViolationType>,
    severity: Option<ViolationSeverity>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Violation>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM violations WHERE TRUE"));

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    if let Some(violation_type) = violation_type {
        builder.push(" AND violation_type = ");
        builder.push_bind(violation_type);
    }

    if let Some(severity) = severity {
        builder.push(" AND severity = ");
        builder.push_bind(severity);
    }

    builder.push(" ORDER BY occurred_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<Violation>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    session_id: Option<&str>,
    violation_type: Option<ViolationType>,
    severity: Option<ViolationSeverity>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM violations WHERE TRUE");

    if let Some(session_id) = session_id {
        builder.push(" AND session_id = ");
        builder.push_bind(session_id);
    }

    if let Some(violation_type) = violation_type {
        builder.push(" AND violation_type = ");
        builder.push_bind(violation_type);
    }

    if let Some(severity) = severity {
        builder.push(" AND severity = ");
        builder.push_bind(severity);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Scoring input: the severity multiset for one session.
pub(crate) async fn list_severities_for_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<ViolationSeverity>, sqlx::Error> {
    sqlx::query_scalar::<_, ViolationSeverity>(
        "SELECT severity FROM violations WHERE session_id = $1 ORDER BY occurred_at",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<Violation>, sqlx::Error> {
    sqlx::query_as::<_, Violation>(&format!(
        "SELECT {COLUMNS} FROM violations WHERE session_id = $1 ORDER BY occurred_at",
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateViolation,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE violations SET
            violation_type = COALESCE($1, violation_type),
            severity = COALESCE($2, severity),
            description = COALESCE($3, description),
            snapshot_url = COALESCE($4, snapshot_url)
         WHERE id = $5",
    )
    .bind(params.violation_type)
    .bind(params.severity)
    .bind(params.description)
    .bind(params.snapshot_url)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM violations WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
