use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::lease_document::LeaseDocument;
use crate::models::signature::{self, SignatureRole};

/// Capability to sign one role on one document. Possession of `token` is the
/// only credential a public signer presents.
#[derive(Debug, Clone, Serialize)]
pub struct SigningToken {
    pub id: i64,
    pub token: String,
    pub document_id: i64,
    pub role: SignatureRole,
    pub tenant_application_id: Option<i64>,
    pub signer_name: Option<String>,
    pub signer_email: Option<String>,
    pub signer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl SigningToken {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSigningToken {
    pub role: SignatureRole,
    #[serde(default)]
    pub signer_name: Option<String>,
    #[serde(default)]
    pub signer_email: Option<String>,
    #[serde(default)]
    pub signer_phone: Option<String>,
    #[serde(default)]
    pub tenant_application_id: Option<i64>,
}

/// Signer contact changes. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignerUpdate {
    #[serde(default)]
    pub signer_name: Option<String>,
    #[serde(default)]
    pub signer_email: Option<String>,
    #[serde(default)]
    pub signer_phone: Option<String>,
}

/// Result of looking up a token. `document` is whatever the token points at,
/// live or not; public callers decide how much of it to show.
#[derive(Debug, Clone)]
pub struct TokenVerification {
    pub token_id: i64,
    pub document: Option<LeaseDocument>,
    pub role: SignatureRole,
    pub tenant_application_id: Option<i64>,
    pub signer_name: Option<String>,
    pub consumed: bool,
    pub expired: bool,
}

impl TokenVerification {
    /// The link was used and its role carries a signature, so the holder may
    /// still view what they signed.
    pub fn signed_through_link(&self) -> bool {
        if !self.consumed {
            return false;
        }
        self.document
            .as_ref()
            .and_then(|doc| doc.tree().ok())
            .is_some_and(|tree| signature::is_role_signed(&tree, self.role))
    }
}

/// A link is expired once the document is gone, no longer accepts signatures,
/// or the bound role has no unsigned placeholder left.
pub fn link_expired(document: Option<&LeaseDocument>, role: SignatureRole) -> bool {
    let Some(doc) = document else {
        return true;
    };
    if !doc.status.allows_signature() {
        return true;
    }
    match doc.tree() {
        Ok(tree) => !signature::has_role(&tree, role) || signature::is_role_signed(&tree, role),
        Err(e) => {
            log::error!("Document {} has unreadable content: {}", doc.id, e);
            true
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl NewSigningToken {
    /// Copy with blank contact fields dropped.
    pub fn normalized(&self) -> Self {
        NewSigningToken {
            role: self.role,
            signer_name: trimmed(&self.signer_name),
            signer_email: trimmed(&self.signer_email),
            signer_phone: trimmed(&self.signer_phone),
            tenant_application_id: self.tenant_application_id,
        }
    }
}

impl SignerUpdate {
    pub fn normalized(&self) -> Self {
        SignerUpdate {
            signer_name: trimmed(&self.signer_name),
            signer_email: trimmed(&self.signer_email),
            signer_phone: trimmed(&self.signer_phone),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.signer_name.is_none() && self.signer_email.is_none() && self.signer_phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lease_document::tree::{DocumentTree, Node};
    use crate::models::lease_document::DocumentStatus;
    use crate::models::signature::{SignaturePlaceholder, SignatureStamp};

    fn document(status: DocumentStatus, tree: &DocumentTree) -> LeaseDocument {
        LeaseDocument {
            id: 1,
            title: "Lease".to_string(),
            content: tree.to_json(),
            status,
            version: 1,
            tenancy_record_id: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn two_party_tree() -> DocumentTree {
        DocumentTree::new(vec![
            Node::signature(SignaturePlaceholder::unsigned(SignatureRole::PropertyManager, "PM")),
            Node::signature(SignaturePlaceholder::unsigned(SignatureRole::Tenant, "Tenant")),
        ])
    }

    #[test]
    fn live_link_for_unsigned_role() {
        let doc = document(DocumentStatus::Finalized, &two_party_tree());
        assert!(!link_expired(Some(&doc), SignatureRole::Tenant));
    }

    #[test]
    fn expired_without_document_or_in_wrong_status() {
        assert!(link_expired(None, SignatureRole::Tenant));
        for status in [DocumentStatus::Draft, DocumentStatus::Signed] {
            let doc = document(status, &two_party_tree());
            assert!(link_expired(Some(&doc), SignatureRole::Tenant));
        }
    }

    #[test]
    fn expired_once_role_signed_or_missing() {
        let stamp = SignatureStamp {
            signature_image_ref: "https://files.example.com/t.png".to_string(),
            signed_by_name: "Tenant".to_string(),
            signed_at: Utc::now(),
        };
        let signed = signature::stamp(&two_party_tree(), SignatureRole::Tenant, &stamp).unwrap();
        let doc = document(DocumentStatus::Signing, &signed);
        assert!(link_expired(Some(&doc), SignatureRole::Tenant));
        assert!(!link_expired(Some(&doc), SignatureRole::PropertyManager));
        assert!(link_expired(Some(&doc), SignatureRole::TenantWitness));
    }

    fn verification(doc: LeaseDocument, consumed: bool) -> TokenVerification {
        TokenVerification {
            token_id: 1,
            expired: link_expired(Some(&doc), SignatureRole::Tenant),
            document: Some(doc),
            role: SignatureRole::Tenant,
            tenant_application_id: None,
            signer_name: None,
            consumed,
        }
    }

    #[test]
    fn used_link_for_signed_role_stays_viewable() {
        let stamp = SignatureStamp {
            signature_image_ref: "https://files.example.com/t.png".to_string(),
            signed_by_name: "Tenant".to_string(),
            signed_at: Utc::now(),
        };
        let signed = signature::stamp(&two_party_tree(), SignatureRole::Tenant, &stamp).unwrap();

        let used = verification(document(DocumentStatus::Signing, &signed), true);
        assert!(used.expired);
        assert!(used.signed_through_link());

        // Signed in person while the link was still outstanding
        let unused = verification(document(DocumentStatus::Signing, &signed), false);
        assert!(!unused.signed_through_link());

        let live = verification(document(DocumentStatus::Finalized, &two_party_tree()), false);
        assert!(!live.expired);
        assert!(!live.signed_through_link());
    }

    #[test]
    fn blank_contact_fields_are_dropped() {
        let update = SignerUpdate {
            signer_name: Some("  ".to_string()),
            signer_email: Some(" ama@example.com ".to_string()),
            signer_phone: None,
        }
        .normalized();
        assert_eq!(update.signer_name, None);
        assert_eq!(update.signer_email.as_deref(), Some("ama@example.com"));
        assert!(!update.is_empty());
        assert!(SignerUpdate::default().is_empty());
    }
}
