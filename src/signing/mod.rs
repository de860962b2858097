//! Recording signatures.
//!
//! Both entry points lock the document row, stamp a copy of the tree, derive the
//! new status from the stamped tree and write it back under the version guard,
//! all in one transaction. Of two concurrent signatures for the same role, the
//! second sees the first one's stamp once it gets the lock and fails with a
//! conflict.

use serde_json::json;
use sqlx::{PgConnection, PgPool};

use crate::audit;
use crate::errors::AppError;
use crate::models::lease_document::lifecycle;
use crate::models::lease_document::queries as documents;
use crate::models::lease_document::{DocumentStatus, DocumentTree, LeaseDocument};
use crate::models::signature::{self, SignatureRole, SignatureStamp};
use crate::models::signing_token;

/// A stamped tree together with the status it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedDocument {
    pub tree: DocumentTree,
    pub status: DocumentStatus,
}

/// Stamp `role` on a copy of the document's tree. Nothing is persisted.
pub fn apply_signature(
    doc: &LeaseDocument,
    role: SignatureRole,
    stamp: &SignatureStamp,
) -> Result<SignedDocument, AppError> {
    if doc.status.is_terminal() {
        return Err(AppError::Conflict("Document is already fully signed".to_string()));
    }
    if !doc.status.allows_signature() {
        return Err(AppError::Validation(
            "Document must be finalized before it can be signed".to_string(),
        ));
    }

    let tree = doc.tree()?;
    let stamped = signature::stamp(&tree, role, stamp)?;
    let status = lifecycle::status_after_signature(doc.status, &stamped)?;
    Ok(SignedDocument { tree: stamped, status })
}

async fn persist(conn: &mut PgConnection, doc: &LeaseDocument, signed: &SignedDocument) -> Result<i64, AppError> {
    documents::write(&mut *conn, doc.id, doc.version, &signed.tree.to_json(), signed.status).await
}

fn log_signature(doc: &LeaseDocument, role: SignatureRole, signed: &SignedDocument) {
    log::info!("Document {} signed by role {}", doc.id, role);
    if signed.status != doc.status {
        log::info!("Document {} moved from {} to {}", doc.id, doc.status, signed.status);
    }
}

/// Signature by an authenticated user acting for `role`.
pub async fn sign_directly(
    pool: &PgPool,
    document_id: i64,
    role: SignatureRole,
    stamp: &SignatureStamp,
    actor: i64,
) -> Result<LeaseDocument, AppError> {
    let mut tx = pool.begin().await?;
    let doc = documents::lock_for_update(&mut *tx, document_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let signed = apply_signature(&doc, role, stamp)?;
    persist(&mut tx, &doc, &signed).await?;
    audit::log(
        &mut *tx,
        Some(actor),
        "lease_document.signed",
        "lease_document",
        document_id,
        json!({
            "role": role,
            "signed_by_name": stamp.signed_by_name.trim(),
            "status": signed.status,
        }),
    )
    .await?;
    tx.commit().await?;

    log_signature(&doc, role, &signed);
    documents::find_by_id(pool, document_id).await?.ok_or(AppError::NotFound)
}

/// Signature through a signing link. The role is the one the token was issued
/// for; the token is consumed in the same transaction as the stamp.
pub async fn sign_with_token(pool: &PgPool, token: &str, stamp: &SignatureStamp) -> Result<LeaseDocument, AppError> {
    let record = signing_token::find_by_token(pool, token)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut tx = pool.begin().await?;
    let doc = match documents::lock_for_update(&mut *tx, record.document_id).await? {
        Some(doc) if doc.status != DocumentStatus::Draft => doc,
        _ => return Err(AppError::Expired),
    };

    let signed = apply_signature(&doc, record.role, stamp)?;
    persist(&mut tx, &doc, &signed).await?;
    signing_token::consume_on_sign(&mut *tx, record.id).await?;
    audit::log(
        &mut *tx,
        None,
        "lease_document.signed",
        "lease_document",
        doc.id,
        json!({
            "role": record.role,
            "signed_by_name": stamp.signed_by_name.trim(),
            "token_id": record.id,
            "status": signed.status,
        }),
    )
    .await?;
    tx.commit().await?;

    log_signature(&doc, record.role, &signed);
    documents::find_by_id(pool, doc.id).await?.ok_or(AppError::NotFound)
}
