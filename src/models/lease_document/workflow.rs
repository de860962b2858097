//! Authoring operations. Each one runs in a transaction that locks the document
//! row, applies a pure change, writes back under the version guard and records an
//! audit entry before committing.

use serde_json::json;
use sqlx::PgPool;

use super::lifecycle::{self, DocumentStatus, TransitionError};
use super::queries;
use super::tree::{DocumentTree, TreeError};
use super::types::*;
use crate::audit;
use crate::errors::AppError;
use crate::models::signature;
use crate::models::template::{self, build_field_map};
use crate::models::tenancy;

const MAX_TITLE_LEN: usize = 200;

fn validate_title(title: &str) -> Result<&str, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!("Title must be at most {MAX_TITLE_LEN} characters")));
    }
    Ok(title)
}

fn parse_content(content: Option<&serde_json::Value>) -> Result<DocumentTree, TreeError> {
    let tree = match content {
        None | Some(serde_json::Value::Null) => DocumentTree::default(),
        Some(value) => DocumentTree::from_value(value.clone())?,
    };
    tree.validate()?;
    Ok(tree)
}

fn require_draft(doc: &LeaseDocument, action: &'static str) -> Result<(), AppError> {
    if doc.status.allows_content_edit() {
        Ok(())
    } else {
        log::warn!("Rejected {} on document {} in status {}", action, doc.id, doc.status);
        Err(TransitionError::NotAllowed { from: doc.status, action }.into())
    }
}

fn token_count(tree: &DocumentTree) -> usize {
    template::unresolved_tokens(tree).len()
}

pub async fn create(pool: &PgPool, new: &NewLeaseDocument, actor: Option<i64>) -> Result<LeaseDocument, AppError> {
    let title = validate_title(&new.title)?;
    let tree = parse_content(new.content.as_ref())?;

    let mut tx = pool.begin().await?;
    let id = queries::insert(&mut *tx, title, &tree.to_json(), new.tenancy_record_id, actor).await?;
    audit::log(
        &mut *tx,
        actor,
        "lease_document.created",
        "lease_document",
        id,
        json!({"title": title, "tenancy_record_id": new.tenancy_record_id}),
    )
    .await?;
    tx.commit().await?;

    log::info!("Created lease document {id}");
    queries::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

/// Replace the content of a draft.
pub async fn update_content(
    pool: &PgPool,
    id: i64,
    update: &ContentUpdate,
    actor: Option<i64>,
) -> Result<LeaseDocument, AppError> {
    let tree = parse_content(Some(&update.content))?;

    let mut tx = pool.begin().await?;
    let doc = queries::lock_for_update(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    require_draft(&doc, "edit")?;
    if let Some(expected) = update.expected_version {
        if expected != doc.version {
            return Err(AppError::Conflict(format!(
                "Document is at version {}, not {expected}",
                doc.version
            )));
        }
    }

    let version = queries::write(&mut *tx, id, doc.version, &tree.to_json(), doc.status).await?;
    audit::log(&mut *tx, actor, "lease_document.content_updated", "lease_document", id, json!({"version": version}))
        .await?;
    tx.commit().await?;

    queries::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

/// Fill template tokens from the tenancy record. Tokens without a value stay in
/// place and are reported back; they are never an error.
pub async fn resolve_fields(
    pool: &PgPool,
    id: i64,
    request: &ResolveRequest,
    actor: Option<i64>,
) -> Result<ResolveOutcome, AppError> {
    let mut tx = pool.begin().await?;
    let doc = queries::lock_for_update(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    require_draft(&doc, "resolve fields of")?;

    let record_id = request
        .tenancy_record_id
        .or(doc.tenancy_record_id)
        .ok_or_else(|| AppError::Validation("Document is not linked to a tenancy record".to_string()))?;
    let record = tenancy::find_by_id(&mut *tx, record_id).await?.ok_or(AppError::NotFound)?;

    let tree = doc.tree()?;
    let fields = build_field_map(&record);
    let resolved = template::resolve(&tree, &fields);
    let unresolved = template::unresolved_tokens(&resolved);
    let resolved_fields = token_count(&tree) - unresolved.len();

    let version = if resolved == tree {
        doc.version
    } else {
        queries::write(&mut *tx, id, doc.version, &resolved.to_json(), doc.status).await?
    };
    audit::log(
        &mut *tx,
        actor,
        "lease_document.fields_resolved",
        "lease_document",
        id,
        json!({"tenancy_record_id": record_id, "resolved": resolved_fields, "unresolved": unresolved}),
    )
    .await?;
    tx.commit().await?;

    if !unresolved.is_empty() {
        log::info!("Document {} has {} unresolved field(s) after resolve", id, unresolved.len());
    }
    Ok(ResolveOutcome { document_id: id, version, resolved_fields, unresolved })
}

/// Append a signature block for a role the draft does not have yet.
pub async fn insert_placeholder(
    pool: &PgPool,
    id: i64,
    request: &PlaceholderRequest,
    actor: Option<i64>,
) -> Result<LeaseDocument, AppError> {
    let mut tx = pool.begin().await?;
    let doc = queries::lock_for_update(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    require_draft(&doc, "add a signature block to")?;

    let tree = doc.tree()?;
    let label = request.label.as_deref().unwrap_or("");
    let updated = signature::insert_placeholder(&tree, request.role, label)?;

    queries::write(&mut *tx, id, doc.version, &updated.to_json(), doc.status).await?;
    audit::log(
        &mut *tx,
        actor,
        "lease_document.placeholder_added",
        "lease_document",
        id,
        json!({"role": request.role}),
    )
    .await?;
    tx.commit().await?;

    queries::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

type Transition = fn(DocumentStatus, &DocumentTree) -> Result<DocumentStatus, TransitionError>;

async fn transition(
    pool: &PgPool,
    id: i64,
    actor: Option<i64>,
    apply: Transition,
    audit_action: &str,
) -> Result<LeaseDocument, AppError> {
    let mut tx = pool.begin().await?;
    let doc = queries::lock_for_update(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    let tree = doc.tree()?;

    let next = match apply(doc.status, &tree) {
        Ok(next) => next,
        Err(e) => {
            log::warn!("Document {id}: {e}");
            return Err(e.into());
        }
    };

    queries::write(&mut *tx, id, doc.version, &doc.content, next).await?;
    audit::log(
        &mut *tx,
        actor,
        audit_action,
        "lease_document",
        id,
        json!({"from": doc.status, "to": next}),
    )
    .await?;
    tx.commit().await?;

    log::info!("Document {} moved from {} to {}", id, doc.status, next);
    queries::find_by_id(pool, id).await?.ok_or(AppError::NotFound)
}

/// DRAFT -> FINALIZED once both primary signature blocks exist.
pub async fn finalize(pool: &PgPool, id: i64, actor: Option<i64>) -> Result<LeaseDocument, AppError> {
    transition(pool, id, actor, lifecycle::finalize, "lease_document.finalized").await
}

/// FINALIZED -> DRAFT while nobody has signed.
pub async fn revert_to_draft(pool: &PgPool, id: i64, actor: Option<i64>) -> Result<LeaseDocument, AppError> {
    transition(pool, id, actor, lifecycle::revert_to_draft, "lease_document.reverted").await
}

pub async fn delete(pool: &PgPool, id: i64, actor: Option<i64>) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let doc = queries::lock_for_update(&mut *tx, id).await?.ok_or(AppError::NotFound)?;
    require_draft(&doc, "delete")?;

    queries::delete(&mut *tx, id).await?;
    audit::log(&mut *tx, actor, "lease_document.deleted", "lease_document", id, json!({"title": doc.title}))
        .await?;
    tx.commit().await?;

    log::info!("Deleted lease document {id}");
    Ok(())
}
