use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Class;

const COLUMNS: &str = "id, name, code, description, admin_id, created_at, updated_at";

pub(crate) struct CreateClass<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) code: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) admin_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateClass {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) code: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateClass<'_>) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "INSERT INTO classes (
            id, name, code, description, admin_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.code)
    .bind(params.description)
    .bind(params.admin_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Codes are stored upper-case; callers normalize before lookup.
pub(crate) async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE code = $1"))
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    admin_id: Option<&str>,
    search: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Class>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM classes WHERE TRUE"));

    if let Some(admin_id) = admin_id {
        builder.push(" AND admin_id = ");
        builder.push_bind(admin_id);
    }

    if let Some(search) = search {
        builder.push(" AND name ILIKE ");
        builder.push_bind(format!("%{search}%"));
    }

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<Class>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    admin_id: Option<&str>,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM classes WHERE TRUE");

    if let Some(admin_id) = admin_id {
        builder.push(" AND admin_id = ");
        builder.push_bind(admin_id);
    }

    if let Some(search) = search {
        builder.push(" AND name ILIKE ");
        builder.push_bind(format!("%{search}%"));
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateClass,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE classes SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            code = COALESCE($3, code),
            updated_at = $4
         WHERE id = $5",
    )
    .bind(params.name)
    .bind(params.description)
    .bind(params.code)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
