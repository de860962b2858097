use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;

use super::types::*;
use crate::audit;
use crate::errors::AppError;
use crate::models::lease_document::queries as documents;
use crate::models::signature::{self, SignatureRole};
use crate::notify::SignerNotifier;

const TOKEN_BYTES: usize = 32;

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    token: String,
    document_id: i64,
    role: String,
    tenant_application_id: Option<i64>,
    signer_name: Option<String>,
    signer_email: Option<String>,
    signer_phone: Option<String>,
    created_at: DateTime<Utc>,
    last_sent_at: Option<DateTime<Utc>>,
    consumed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TokenRow> for SigningToken {
    type Error = AppError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<SignatureRole>()
            .map_err(|e| AppError::Db(sqlx::Error::Decode(e.into())))?;
        Ok(SigningToken {
            id: row.id,
            token: row.token,
            document_id: row.document_id,
            role,
            tenant_application_id: row.tenant_application_id,
            signer_name: row.signer_name,
            signer_email: row.signer_email,
            signer_phone: row.signer_phone,
            created_at: row.created_at,
            last_sent_at: row.last_sent_at,
            consumed_at: row.consumed_at,
        })
    }
}

/// 32 random bytes, hex-encoded.
pub fn new_token_value(rng: &mut impl Rng) -> String {
    let bytes: [u8; TOKEN_BYTES] = rng.random();
    hex::encode(bytes)
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<Option<SigningToken>, AppError> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                signer_phone, created_at, last_sent_at, consumed_at \
         FROM signing_tokens WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(SigningToken::try_from).transpose()
}

pub async fn find_by_token<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<SigningToken>, AppError> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                signer_phone, created_at, last_sent_at, consumed_at \
         FROM signing_tokens WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(executor)
    .await?;

    row.map(SigningToken::try_from).transpose()
}

/// All tokens issued for a document, oldest first.
pub async fn find_for_document(pool: &PgPool, document_id: i64) -> Result<Vec<SigningToken>, AppError> {
    let rows = sqlx::query_as::<_, TokenRow>(
        "SELECT id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                signer_phone, created_at, last_sent_at, consumed_at \
         FROM signing_tokens WHERE document_id = $1 ORDER BY id ASC",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SigningToken::try_from).collect()
}

/// Issue a signing link for one role. The insert stamps `last_sent_at`, so the
/// first resend is already subject to the cooldown.
pub async fn generate(
    pool: &PgPool,
    document_id: i64,
    new: &NewSigningToken,
    actor: Option<i64>,
) -> Result<SigningToken, AppError> {
    let new = new.normalized();
    let value = new_token_value(&mut rand::rng());

    let mut tx = pool.begin().await?;
    let doc = documents::lock_for_update(&mut *tx, document_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !doc.status.allows_token_issue() {
        log::warn!("Refused signing link for document {} in status {}", document_id, doc.status);
        return Err(AppError::Validation(format!(
            "Signing links can only be issued for finalized documents (status is {})",
            doc.status
        )));
    }
    let tree = doc.tree()?;
    if !signature::has_role(&tree, new.role) {
        return Err(AppError::NotFound);
    }
    if signature::is_role_signed(&tree, new.role) {
        return Err(AppError::Conflict(format!("Role {} has already signed", new.role)));
    }

    let row = sqlx::query_as::<_, TokenRow>(
        "INSERT INTO signing_tokens \
             (token, document_id, role, tenant_application_id, signer_name, signer_email, signer_phone, \
              last_sent_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
         RETURNING id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                   signer_phone, created_at, last_sent_at, consumed_at",
    )
    .bind(&value)
    .bind(document_id)
    .bind(new.role.as_str())
    .bind(new.tenant_application_id)
    .bind(&new.signer_name)
    .bind(&new.signer_email)
    .bind(&new.signer_phone)
    .fetch_one(&mut *tx)
    .await?;
    let token = SigningToken::try_from(row)?;

    audit::log(
        &mut *tx,
        actor,
        "signing_token.issued",
        "lease_document",
        document_id,
        json!({"token_id": token.id, "role": token.role}),
    )
    .await?;
    tx.commit().await?;

    log::info!("Issued signing link {} for document {} role {}", token.id, document_id, token.role);
    Ok(token)
}

/// Look a token up without changing anything. Unknown tokens are `NotFound`;
/// everything else reports through `expired`. Repeatable after the link is used.
pub async fn verify(pool: &PgPool, token: &str) -> Result<TokenVerification, AppError> {
    let record = find_by_token(pool, token).await?.ok_or(AppError::NotFound)?;
    let document = documents::find_by_id(pool, record.document_id).await?;
    let expired = link_expired(document.as_ref(), record.role);

    Ok(TokenVerification {
        token_id: record.id,
        consumed: record.is_consumed(),
        document,
        role: record.role,
        tenant_application_id: record.tenant_application_id,
        signer_name: record.signer_name,
        expired,
    })
}

/// Mark a token used. Runs inside the signing transaction, after the stamp.
pub async fn consume_on_sign<'e, E: PgExecutor<'e>>(executor: E, token_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE signing_tokens SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL")
        .bind(token_id)
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::Conflict("Signing link has already been used".to_string()));
    }
    Ok(())
}

fn seconds_remaining(last_sent_at: Option<DateTime<Utc>>, cooldown: Duration, now: DateTime<Utc>) -> u64 {
    let Some(sent) = last_sent_at else {
        return 0;
    };
    let elapsed = (now - sent).num_milliseconds().max(0) as u128;
    let cooldown_ms = cooldown.as_millis();
    if elapsed >= cooldown_ms {
        0
    } else {
        (cooldown_ms - elapsed).div_ceil(1000) as u64
    }
}

/// Send the signing link again. The `last_sent_at` check and update happen in one
/// statement, so concurrent resends inside the cooldown window send only once.
pub async fn resend(
    pool: &PgPool,
    token_id: i64,
    cooldown: Duration,
    notifier: &dyn SignerNotifier,
    signing_url: impl Fn(&str) -> String,
) -> Result<SigningToken, AppError> {
    let current = find_by_id(pool, token_id).await?.ok_or(AppError::NotFound)?;
    if current.is_consumed() {
        return Err(AppError::Conflict("Signing link has already been used".to_string()));
    }
    let document = documents::find_by_id(pool, current.document_id).await?;
    if link_expired(document.as_ref(), current.role) {
        return Err(AppError::Expired);
    }

    let row = sqlx::query_as::<_, TokenRow>(
        "UPDATE signing_tokens SET last_sent_at = NOW() \
         WHERE id = $1 AND consumed_at IS NULL \
           AND (last_sent_at IS NULL OR last_sent_at <= NOW() - make_interval(secs => $2)) \
         RETURNING id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                   signer_phone, created_at, last_sent_at, consumed_at",
    )
    .bind(token_id)
    .bind(cooldown.as_secs_f64())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        let latest = find_by_id(pool, token_id).await?.ok_or(AppError::NotFound)?;
        if latest.is_consumed() {
            return Err(AppError::Conflict("Signing link has already been used".to_string()));
        }
        let wait = seconds_remaining(latest.last_sent_at, cooldown, Utc::now()).max(1);
        return Err(AppError::CooldownActive(wait));
    };
    let token = SigningToken::try_from(row)?;

    if let Err(e) = notifier.notify_signer(&token, &signing_url(&token.token)) {
        log::error!("Resend of signing link {} failed: {}", token.id, e);
    } else {
        log::info!("Resent signing link {} for document {}", token.id, token.document_id);
    }
    Ok(token)
}

/// Change who the link is addressed to. Not allowed once it has been used.
pub async fn update(pool: &PgPool, token_id: i64, changes: &SignerUpdate) -> Result<SigningToken, AppError> {
    let changes = changes.normalized();
    if changes.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let row = sqlx::query_as::<_, TokenRow>(
        "UPDATE signing_tokens \
         SET signer_name = COALESCE($2, signer_name), \
             signer_email = COALESCE($3, signer_email), \
             signer_phone = COALESCE($4, signer_phone) \
         WHERE id = $1 AND consumed_at IS NULL \
         RETURNING id, token, document_id, role, tenant_application_id, signer_name, signer_email, \
                   signer_phone, created_at, last_sent_at, consumed_at",
    )
    .bind(token_id)
    .bind(&changes.signer_name)
    .bind(&changes.signer_email)
    .bind(&changes.signer_phone)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => SigningToken::try_from(row),
        None => match find_by_id(pool, token_id).await? {
            Some(_) => Err(AppError::Conflict("Signing link has already been used".to_string())),
            None => Err(AppError::NotFound),
        },
    }
}
