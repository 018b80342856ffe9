use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::ExamSession;
use crate::db::types::SessionStatus;

const COLUMNS: &str = "\
    id, exam_id, student_id, started_at, ended_at, status, cheating_score, tab_switches";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) status: SessionStatus,
    pub(crate) cheating_score: i32,
    pub(crate) tab_switches: i32,
}

pub(crate) struct UpdateSession {
    pub(crate) status: Option<SessionStatus>,
    pub(crate) cheating_score: Option<i32>,
    pub(crate) tab_switches: Option<i32>,
}

/// Conditional insert: the unique (exam_id, student_id) index serializes
/// concurrent identical joins; the loser observes `None` instead of a
/// duplicate row.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "INSERT INTO exam_sessions (
            id, exam_id, student_id, started_at, status, cheating_score, tab_switches
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (exam_id, student_id) DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(session.id)
    .bind(session.exam_id)
    .bind(session.student_id)
    .bind(session.started_at)
    .bind(session.status)
    .bind(session.cheating_score)
    .bind(session.tab_switches)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<ExamSession, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Row lock for the tab-switch and submit flows so concurrent updates to
/// one session serialize.
pub(crate) async fn fetch_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    exam_id: Option<&str>,
    student_id: Option<&str>,
    status: Option<SessionStatus>,
    offset: i64,
    limit: i64,
) -> Result<Vec<ExamSession>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exam_sessions WHERE TRUE"));

    if let Some(exam_id) = exam_id {
        builder.push(" AND exam_id = ");
        builder.push_bind(exam_id);
    }

    if let Some(student_id) = student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY started_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<ExamSession>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    exam_id: Option<&str>,
    student_id: Option<&str>,
    status: Option<SessionStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exam_sessions WHERE TRUE");

    if let Some(exam_id) = exam_id {
        builder.push(" AND exam_id = ");
        builder.push_bind(exam_id);
    }

    if let Some(student_id) = student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn update_fields(
    pool: &PgPool,
    id: &str,
    params: UpdateSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_sessions SET
            status = COALESCE($1, status),
            cheating_score = COALESCE($2, cheating_score),
            tab_switches = COALESCE($3, tab_switches)
         WHERE id = $4",
    )
    .bind(params.status)
    .bind(params.cheating_score)
    .bind(params.tab_switches)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn update_score(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    cheating_score: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exam_sessions SET cheating_score = $1 WHERE id = $2")
        .bind(cheating_score)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn increment_tab_switches(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE exam_sessions SET tab_switches = tab_switches + 1
         WHERE id = $1
         RETURNING tab_switches",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// The single transition out of `active`: stamps `ended_at` exactly once
/// and records the final score.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: SessionStatus,
    cheating_score: i32,
    ended_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_sessions SET status = $1, cheating_score = $2, ended_at = $3 WHERE id = $4",
    )
    .bind(status)
    .bind(cheating_score)
    .bind(ended_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM exam_sessions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
