//! Tenancy source records the document fields are filled from. Read-only apart
//! from `insert`, which seeds records for imports and tests.

use sqlx::PgExecutor;

use crate::errors::AppError;
use crate::models::template::TenancyRecord;

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<Option<TenancyRecord>, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT record FROM tenancy_records WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    match row {
        Some((record,)) => Ok(Some(serde_json::from_str(&record)?)),
        None => Ok(None),
    }
}

pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, record: &TenancyRecord) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as("INSERT INTO tenancy_records (record) VALUES ($1) RETURNING id")
        .bind(serde_json::to_string(record)?)
        .fetch_one(executor)
        .await?;
    Ok(id)
}
