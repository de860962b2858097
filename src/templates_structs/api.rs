use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::lease_document::{DocumentStatus, LeaseDocument, LeaseDocumentPage, render};
use crate::models::signature::{self, SignatureRole};
use crate::models::signing_token::SigningToken;
use crate::models::template;

/// Generic paginated response wrapper for API endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl From<LeaseDocumentPage> for PaginatedResponse<crate::models::lease_document::LeaseDocumentListItem> {
    fn from(p: LeaseDocumentPage) -> Self {
        PaginatedResponse {
            items: p.items,
            page: p.page,
            per_page: p.per_page,
            total: p.total,
        }
    }
}

/// Error body for API responses.
#[derive(Serialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ApiSignatureStatus {
    pub role: SignatureRole,
    pub label: String,
    pub signed: bool,
    pub signed_by_name: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

/// Full document for the manager API: content tree plus derived signing state.
#[derive(Serialize, Debug, Clone)]
pub struct ApiDocumentResponse {
    pub id: i64,
    pub title: String,
    pub status: DocumentStatus,
    pub version: i64,
    pub tenancy_record_id: Option<i64>,
    pub content: serde_json::Value,
    pub signatures: Vec<ApiSignatureStatus>,
    pub unresolved_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiDocumentResponse {
    pub fn from_document(doc: LeaseDocument) -> Result<Self, AppError> {
        let tree = doc.tree()?;
        let signatures = signature::list_placeholders(&tree)
            .into_iter()
            .map(|p| ApiSignatureStatus {
                role: p.role,
                label: p.label.clone(),
                signed: p.is_signed(),
                signed_by_name: p.signed_by_name.clone(),
                signed_at: p.signed_at,
            })
            .collect();
        Ok(ApiDocumentResponse {
            content: tree.to_value(),
            unresolved_tokens: template::unresolved_tokens(&tree),
            signatures,
            id: doc.id,
            title: doc.title,
            status: doc.status,
            version: doc.version,
            tenancy_record_id: doc.tenancy_record_id,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

/// Signing link as shown to managers, with the URL to hand out.
#[derive(Serialize, Debug, Clone)]
pub struct ApiSigningTokenResponse {
    pub id: i64,
    pub document_id: i64,
    pub role: SignatureRole,
    pub tenant_application_id: Option<i64>,
    pub signer_name: Option<String>,
    pub signer_email: Option<String>,
    pub signer_phone: Option<String>,
    pub signing_url: String,
    pub created_at: DateTime<Utc>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl ApiSigningTokenResponse {
    pub fn new(token: SigningToken, signing_url: String) -> Self {
        ApiSigningTokenResponse {
            id: token.id,
            document_id: token.document_id,
            role: token.role,
            tenant_application_id: token.tenant_application_id,
            signer_name: token.signer_name,
            signer_email: token.signer_email,
            signer_phone: token.signer_phone,
            signing_url,
            created_at: token.created_at,
            last_sent_at: token.last_sent_at,
            consumed_at: token.consumed_at,
        }
    }
}

/// Document as a public signer sees it.
#[derive(Serialize, Debug, Clone)]
pub struct ApiPublicDocument {
    pub id: i64,
    pub title: String,
    pub status: DocumentStatus,
    pub html: String,
}

impl ApiPublicDocument {
    pub fn from_document(doc: &LeaseDocument) -> Result<Self, AppError> {
        Ok(ApiPublicDocument {
            id: doc.id,
            title: doc.title.clone(),
            status: doc.status,
            html: render::to_html(&doc.tree()?),
        })
    }
}

/// Public token check. Dead links carry no document unless the holder already
/// signed through them.
#[derive(Serialize, Debug, Clone)]
pub struct ApiTokenVerification {
    pub expired: bool,
    pub already_signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<SignatureRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<ApiPublicDocument>,
}

impl ApiTokenVerification {
    pub fn expired() -> Self {
        ApiTokenVerification { expired: true, already_signed: false, role: None, signer_name: None, document: None }
    }

    pub fn live(doc: &LeaseDocument, role: SignatureRole, signer_name: Option<String>) -> Result<Self, AppError> {
        Ok(ApiTokenVerification {
            expired: false,
            already_signed: false,
            role: Some(role),
            signer_name,
            document: Some(ApiPublicDocument::from_document(doc)?),
        })
    }

    /// A used link viewed again by its holder.
    pub fn signed(doc: &LeaseDocument, role: SignatureRole, signer_name: Option<String>) -> Result<Self, AppError> {
        Ok(ApiTokenVerification {
            expired: true,
            already_signed: true,
            role: Some(role),
            signer_name,
            document: Some(ApiPublicDocument::from_document(doc)?),
        })
    }
}

/// Body for a manager signing in person.
#[derive(Deserialize, Debug)]
pub struct ApiSignRequest {
    pub role: SignatureRole,
    pub signed_by_name: String,
    pub signature_image_ref: String,
}

/// Body for a signing-link signature (JSON or form). The role is never taken
/// from the request.
#[derive(Deserialize, Debug)]
pub struct SignSubmission {
    pub signed_by_name: String,
    pub signature_image_ref: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct DocumentListQuery {
    pub status: Option<DocumentStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
