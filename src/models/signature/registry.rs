use std::collections::BTreeMap;

use super::types::*;
use crate::models::lease_document::tree::{DocumentTree, Node, NodeKind, NodePath, SIGNATURE_FIELDS};

/// All signature placeholders in document order.
pub fn list_placeholders(tree: &DocumentTree) -> Vec<&SignaturePlaceholder> {
    tree.nodes().filter_map(Node::as_signature).collect()
}

/// Signing state of every role that has a placeholder in the tree.
pub fn status_by_role(tree: &DocumentTree) -> BTreeMap<SignatureRole, RoleStatus> {
    let mut statuses = BTreeMap::new();
    for p in list_placeholders(tree) {
        statuses.entry(p.role).or_insert_with(|| RoleStatus {
            signed: p.is_signed(),
            signed_at: p.signed_at,
            signed_by_name: p.signed_by_name.clone(),
        });
    }
    statuses
}

pub fn has_role(tree: &DocumentTree, role: SignatureRole) -> bool {
    list_placeholders(tree).iter().any(|p| p.role == role)
}

pub fn is_role_signed(tree: &DocumentTree, role: SignatureRole) -> bool {
    list_placeholders(tree).iter().any(|p| p.role == role && p.is_signed())
}

/// True iff every placeholder is signed. A tree without placeholders is vacuously
/// signed; the finalize guard keeps such documents out of the signing workflow.
pub fn all_signed(tree: &DocumentTree) -> bool {
    list_placeholders(tree).iter().all(|p| p.is_signed())
}

pub fn any_signed(tree: &DocumentTree) -> bool {
    list_placeholders(tree).iter().any(|p| p.is_signed())
}

/// Write a signature into the placeholder for `role`, returning the new tree.
///
/// Not idempotent: a signed placeholder yields `AlreadySigned`, so a repeated
/// submission is reported rather than silently overwritten.
pub fn stamp(
    tree: &DocumentTree,
    role: SignatureRole,
    stamp: &SignatureStamp,
) -> Result<DocumentTree, RegistryError> {
    let image_ref = stamp.signature_image_ref.trim();
    let signer = stamp.signed_by_name.trim();
    if image_ref.is_empty() {
        return Err(RegistryError::InvalidStamp("signature image reference is required".to_string()));
    }
    if signer.is_empty() {
        return Err(RegistryError::InvalidStamp("signer name is required".to_string()));
    }

    let mut role_seen = false;
    let mut target: Option<NodePath> = None;
    for (node, path) in tree.nodes_with_paths() {
        if let Some(p) = node.as_signature() {
            if p.role == role {
                role_seen = true;
                if !p.is_signed() {
                    target = Some(path);
                    break;
                }
            }
        }
    }

    let path = match target {
        Some(path) => path,
        None if role_seen => return Err(RegistryError::AlreadySigned(role)),
        None => return Err(RegistryError::RoleNotFound(role)),
    };

    let mut stamped = tree.clone();
    if let Some(node) = stamped.node_at_mut(&path) {
        if let NodeKind::Signature(p) = &mut node.kind {
            p.signature_image_ref = Some(image_ref.to_string());
            p.signed_by_name = Some(signer.to_string());
            p.signed_at = Some(stamp.signed_at);
            // Values now live on the placeholder; drop any null keys carried from the read
            node.attrs.retain(|key, _| !SIGNATURE_FIELDS.contains(&key.as_str()) || key == "label");
        }
    }
    Ok(stamped)
}

/// Append an unsigned placeholder for `role` at the end of the document.
pub fn insert_placeholder(
    tree: &DocumentTree,
    role: SignatureRole,
    label: &str,
) -> Result<DocumentTree, RegistryError> {
    if has_role(tree, role) {
        return Err(RegistryError::DuplicateRole(role));
    }
    let label = match label.trim() {
        "" => role.label(),
        l => l,
    };
    let mut updated = tree.clone();
    if let Some(children) = updated.root.children_mut() {
        children.push(Node::paragraph(vec![Node::signature(SignaturePlaceholder::unsigned(role, label))]));
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn stamp_for(name: &str) -> SignatureStamp {
        SignatureStamp {
            signature_image_ref: format!("https://files.example.com/{name}.png"),
            signed_by_name: name.to_string(),
            signed_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn lease() -> DocumentTree {
        DocumentTree::new(vec![
            Node::paragraph(vec![Node::text("Signed by the parties:")]),
            Node::signature(SignaturePlaceholder::unsigned(SignatureRole::PropertyManager, "Manager")),
            Node::paragraph(vec![Node::signature(SignaturePlaceholder::unsigned(
                SignatureRole::Tenant,
                "Tenant",
            ))]),
        ])
    }

    #[test]
    fn lists_placeholders_in_document_order() {
        let roles: Vec<SignatureRole> = list_placeholders(&lease()).iter().map(|p| p.role).collect();
        assert_eq!(roles, vec![SignatureRole::PropertyManager, SignatureRole::Tenant]);
    }

    #[test]
    fn stamp_signs_only_the_requested_role() {
        let tree = lease();
        let signed = stamp(&tree, SignatureRole::Tenant, &stamp_for("Ama Mensah")).unwrap();

        let status = status_by_role(&signed);
        assert!(status[&SignatureRole::Tenant].signed);
        assert_eq!(status[&SignatureRole::Tenant].signed_by_name.as_deref(), Some("Ama Mensah"));
        assert!(!status[&SignatureRole::PropertyManager].signed);
        assert!(!all_signed(&signed));

        // input untouched
        assert!(!any_signed(&tree));
    }

    #[test]
    fn stamped_tree_survives_a_reload() {
        let stored = json!({"root": {"type": "root", "children": [
            {"type": "signature", "role": "TENANT", "label": "Tenant",
             "signatureImageRef": null, "signedByName": null, "signedAt": null}
        ]}});
        let tree = DocumentTree::from_value(stored).unwrap();
        let mut s = stamp_for("Ama Mensah");
        s.signed_at = Utc::now();

        let signed = stamp(&tree, SignatureRole::Tenant, &s).unwrap();
        let reloaded = DocumentTree::from_json(&signed.to_json()).unwrap();
        assert_eq!(reloaded, signed);
        assert_eq!(status_by_role(&reloaded)[&SignatureRole::Tenant].signed_at, Some(s.signed_at));
    }

    #[test]
    fn stamping_twice_is_rejected() {
        let signed = stamp(&lease(), SignatureRole::Tenant, &stamp_for("Ama")).unwrap();
        let err = stamp(&signed, SignatureRole::Tenant, &stamp_for("Kofi")).unwrap_err();
        assert_eq!(err, RegistryError::AlreadySigned(SignatureRole::Tenant));
    }

    #[test]
    fn missing_role_is_reported() {
        let err = stamp(&lease(), SignatureRole::PmWitness, &stamp_for("Yaw")).unwrap_err();
        assert_eq!(err, RegistryError::RoleNotFound(SignatureRole::PmWitness));
    }

    #[test]
    fn blank_stamp_is_invalid() {
        let mut s = stamp_for("Ama");
        s.signed_by_name = "   ".to_string();
        assert!(matches!(
            stamp(&lease(), SignatureRole::Tenant, &s),
            Err(RegistryError::InvalidStamp(_))
        ));
    }

    #[test]
    fn all_signed_after_every_role() {
        let tree = stamp(&lease(), SignatureRole::Tenant, &stamp_for("Ama")).unwrap();
        let tree = stamp(&tree, SignatureRole::PropertyManager, &stamp_for("Kwame")).unwrap();
        assert!(all_signed(&tree));
    }

    #[test]
    fn empty_tree_is_vacuously_signed() {
        assert!(all_signed(&DocumentTree::default()));
        assert!(status_by_role(&DocumentTree::default()).is_empty());
    }

    #[test]
    fn insert_placeholder_enforces_singleton_roles() {
        let tree = insert_placeholder(&lease(), SignatureRole::TenantWitness, "").unwrap();
        let witness = list_placeholders(&tree)
            .into_iter()
            .find(|p| p.role == SignatureRole::TenantWitness)
            .unwrap();
        assert_eq!(witness.label, "Tenant's Witness");
        assert!(tree.validate().is_ok());

        let err = insert_placeholder(&tree, SignatureRole::Tenant, "Second tenant").unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRole(SignatureRole::Tenant));
    }
}
