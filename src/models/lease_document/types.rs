use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::DocumentStatus;
use super::tree::{DocumentTree, TreeError};
use crate::models::signature::SignatureRole;

/// Stored lease document. `content` is the serialized [`DocumentTree`].
#[derive(Debug, Clone, Serialize)]
pub struct LeaseDocument {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: DocumentStatus,
    /// Bumped on every content or status write.
    pub version: i64,
    pub tenancy_record_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaseDocument {
    pub fn tree(&self) -> Result<DocumentTree, TreeError> {
        DocumentTree::from_json(&self.content)
    }
}

/// Document as shown in the list view.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseDocumentListItem {
    pub id: i64,
    pub title: String,
    pub status: DocumentStatus,
    pub tenancy_record_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

pub struct LeaseDocumentPage {
    pub items: Vec<LeaseDocumentListItem>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Request body for creating a document. Missing content starts an empty tree.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLeaseDocument {
    pub title: String,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub tenancy_record_id: Option<i64>,
}

/// Request body for replacing draft content.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentUpdate {
    pub content: serde_json::Value,
    /// When given, the write fails with a conflict if the stored version differs.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveRequest {
    /// Overrides the record the document was created for.
    #[serde(default)]
    pub tenancy_record_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceholderRequest {
    pub role: SignatureRole,
    #[serde(default)]
    pub label: Option<String>,
}

/// Outcome of a resolve pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    pub document_id: i64,
    pub version: i64,
    pub resolved_fields: usize,
    pub unresolved: Vec<String>,
}
