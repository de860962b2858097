use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use super::lifecycle::DocumentStatus;
use super::types::*;
use crate::errors::AppError;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    title: String,
    content: String,
    status: String,
    version: i64,
    tenancy_record_id: Option<i64>,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<DocumentStatus, AppError> {
    raw.parse::<DocumentStatus>()
        .map_err(|e| AppError::Db(sqlx::Error::Decode(e.into())))
}

impl TryFrom<DocumentRow> for LeaseDocument {
    type Error = AppError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(LeaseDocument {
            status: parse_status(&row.status)?,
            id: row.id,
            title: row.title,
            content: row.content,
            version: row.version,
            tenancy_record_id: row.tenancy_record_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Find a single document by id.
pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<Option<LeaseDocument>, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, title, content, status, version, tenancy_record_id, created_by, \
                created_at, updated_at \
         FROM lease_documents WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(LeaseDocument::try_from).transpose()
}

/// Load a document and hold its row lock until the surrounding transaction ends.
/// Every read-modify-write of content or status goes through here.
pub async fn lock_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<LeaseDocument>, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, title, content, status, version, tenancy_record_id, created_by, \
                created_at, updated_at \
         FROM lease_documents WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(LeaseDocument::try_from).transpose()
}

/// List documents, newest activity first, optionally filtered by status.
pub async fn find_all(
    pool: &PgPool,
    status: Option<DocumentStatus>,
    page: i64,
    per_page: i64,
) -> Result<LeaseDocumentPage, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        title: String,
        status: String,
        tenancy_record_id: Option<i64>,
        updated_at: DateTime<Utc>,
    }

    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    let offset = (page - 1) * per_page;
    let status = status.map(|s| s.as_str());

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM lease_documents WHERE ($1::TEXT IS NULL OR status = $1)",
    )
    .bind(status)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, Row>(
        "SELECT id, title, status, tenancy_record_id, updated_at \
         FROM lease_documents \
         WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY updated_at DESC, id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            Ok(LeaseDocumentListItem {
                status: parse_status(&row.status)?,
                id: row.id,
                title: row.title,
                tenancy_record_id: row.tenancy_record_id,
                updated_at: row.updated_at,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(LeaseDocumentPage { items, page, per_page, total })
}

/// Insert a new draft document. Returns the new id.
pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    title: &str,
    content: &str,
    tenancy_record_id: Option<i64>,
    created_by: Option<i64>,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO lease_documents (title, content, status, tenancy_record_id, created_by) \
         VALUES ($1, $2, 'DRAFT', $3, $4) RETURNING id",
    )
    .bind(title)
    .bind(content)
    .bind(tenancy_record_id)
    .bind(created_by)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Write content and status if the stored version still equals `expected_version`.
/// Returns the new version; a stale version is a conflict and writes nothing.
pub async fn write<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    expected_version: i64,
    content: &str,
    status: DocumentStatus,
) -> Result<i64, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE lease_documents \
         SET content = $1, status = $2, version = version + 1, updated_at = NOW() \
         WHERE id = $3 AND version = $4 \
         RETURNING version",
    )
    .bind(content)
    .bind(status.as_str())
    .bind(id)
    .bind(expected_version)
    .fetch_optional(executor)
    .await?;

    row.map(|r| r.0)
        .ok_or_else(|| AppError::Conflict("Document was modified by another request".to_string()))
}

/// Delete a document; its signing tokens go with it.
pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM lease_documents WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
