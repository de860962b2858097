use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgExecutor;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Record an audit entry. Pass the open transaction so the entry commits or
/// rolls back together with the change it describes.
pub async fn log<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Option<i64>,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO audit_log (user_id, action, target_type, target_id, details) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details.to_string())
    .execute(executor)
    .await?;
    Ok(())
}

/// Entries for one target, oldest first.
pub async fn find_for_target<'e, E: PgExecutor<'e>>(
    executor: E,
    target_type: &str,
    target_id: i64,
) -> Result<Vec<AuditEntry>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        user_id: Option<i64>,
        action: String,
        target_type: String,
        target_id: i64,
        details: String,
        created_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT id, user_id, action, target_type, target_id, details, created_at \
         FROM audit_log WHERE target_type = $1 AND target_id = $2 \
         ORDER BY id ASC",
    )
    .bind(target_type)
    .bind(target_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| AuditEntry {
            id: r.id,
            user_id: r.user_id,
            action: r.action,
            target_type: r.target_type,
            target_id: r.target_id,
            details: serde_json::from_str(&r.details).unwrap_or(Value::Null),
            created_at: r.created_at,
        })
        .collect())
}
