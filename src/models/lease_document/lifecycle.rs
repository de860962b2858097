//! Lease document lifecycle.
//!
//! ```text
//! DRAFT --finalize--> FINALIZED --first signature--> SIGNING --last signature--> SIGNED
//!   ^                     |
//!   +---revert to draft---+
//! ```
//!
//! Signature-driven transitions are derived from the tree after a stamp; callers never
//! name the target status themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::tree::DocumentTree;
use crate::errors::AppError;
use crate::models::signature::{self, SignatureRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Finalized,
    Signing,
    Signed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Finalized => "FINALIZED",
            DocumentStatus::Signing => "SIGNING",
            DocumentStatus::Signed => "SIGNED",
        }
    }

    /// Authoring edits (content updates, field resolution, placeholder insertion).
    pub fn allows_content_edit(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// Signing tokens may be issued, resent or updated.
    pub fn allows_token_issue(&self) -> bool {
        matches!(self, DocumentStatus::Finalized | DocumentStatus::Signing)
    }

    pub fn allows_signature(&self) -> bool {
        matches!(self, DocumentStatus::Finalized | DocumentStatus::Signing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Signed)
    }

    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, Finalized) | (Finalized, Draft) | (Finalized, Signing) | (Signing, Signed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(DocumentStatus::Draft),
            "FINALIZED" => Ok(DocumentStatus::Finalized),
            "SIGNING" => Ok(DocumentStatus::Signing),
            "SIGNED" => Ok(DocumentStatus::Signed),
            other => Err(format!("Unknown document status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionError {
    NotAllowed { from: DocumentStatus, action: &'static str },
    MissingPrimaryRoles(Vec<SignatureRole>),
    SignaturesRecorded,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::NotAllowed { from, action } => {
                write!(f, "Cannot {action} a document in status {from}")
            }
            TransitionError::MissingPrimaryRoles(roles) => {
                let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                write!(f, "Cannot finalize: missing signature placeholder for {}", names.join(", "))
            }
            TransitionError::SignaturesRecorded => {
                write!(f, "Cannot revert to draft once a signature has been recorded")
            }
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotAllowed { from: DocumentStatus::Signed, .. } => {
                AppError::Conflict(e.to_string())
            }
            _ => AppError::Validation(e.to_string()),
        }
    }
}

/// DRAFT -> FINALIZED. Both primary roles must have a placeholder.
pub fn finalize(status: DocumentStatus, tree: &DocumentTree) -> Result<DocumentStatus, TransitionError> {
    if status != DocumentStatus::Draft {
        return Err(TransitionError::NotAllowed { from: status, action: "finalize" });
    }
    let missing: Vec<SignatureRole> = SignatureRole::PRIMARY
        .into_iter()
        .filter(|role| !signature::has_role(tree, *role))
        .collect();
    if !missing.is_empty() {
        return Err(TransitionError::MissingPrimaryRoles(missing));
    }
    Ok(DocumentStatus::Finalized)
}

/// FINALIZED -> DRAFT, only while nothing has been signed.
pub fn revert_to_draft(status: DocumentStatus, tree: &DocumentTree) -> Result<DocumentStatus, TransitionError> {
    if status != DocumentStatus::Finalized {
        return Err(TransitionError::NotAllowed { from: status, action: "revert" });
    }
    if signature::any_signed(tree) {
        return Err(TransitionError::SignaturesRecorded);
    }
    Ok(DocumentStatus::Draft)
}

/// Status after a successful stamp, derived from the stamped tree.
pub fn status_after_signature(
    status: DocumentStatus,
    stamped: &DocumentTree,
) -> Result<DocumentStatus, TransitionError> {
    if !status.allows_signature() {
        return Err(TransitionError::NotAllowed { from: status, action: "sign" });
    }
    if signature::all_signed(stamped) {
        Ok(DocumentStatus::Signed)
    } else {
        Ok(DocumentStatus::Signing)
    }
}
