use regex::Regex;
use std::sync::LazyLock;

use super::FieldMap;
use crate::models::lease_document::tree::{DocumentTree, NodeKind};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(\w+)").expect("token pattern is valid"));

/// Field name a token refers to, if its text has the `#FieldName` shape.
pub fn token_field_name(text: &str) -> Option<&str> {
    TOKEN_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replacement text for a token, or `None` when the field is unknown or empty.
/// Anything after the `#FieldName` marker is kept behind the value.
fn substitution(text: &str, fields: &FieldMap) -> Option<String> {
    let caps = TOKEN_PATTERN.captures(text)?;
    let marker = caps.get(0)?;
    let value = fields.get(caps.get(1)?.as_str()).filter(|v| !v.is_empty())?;
    Some(format!("{value}{}", &text[marker.end()..]))
}

/// Substitute field values into the template tokens of a tree.
///
/// Works on a deep copy. Resolved tokens become plain text nodes (keeping their
/// formatting attributes); unresolvable ones stay as `#FieldName` so the gap shows
/// up in the rendered lease. Only `token` nodes are considered, so running the
/// resolver again never touches text it already produced.
pub fn resolve(tree: &DocumentTree, fields: &FieldMap) -> DocumentTree {
    let mut resolved = tree.clone();
    resolved.walk_mut(&mut |node| {
        if let NodeKind::Token(text) = &node.kind {
            if let Some(value) = substitution(text, fields) {
                node.kind = NodeKind::Text(value);
            }
        }
    });
    resolved
}

/// Field names of tokens still present in the tree, in document order, deduplicated.
pub fn unresolved_tokens(tree: &DocumentTree) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for node in tree.nodes() {
        if let NodeKind::Token(text) = &node.kind {
            if let Some(name) = token_field_name(text) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lease_document::tree::Node;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn template() -> DocumentTree {
        DocumentTree::new(vec![
            Node::paragraph(vec![
                Node::text("This agreement is made with "),
                Node::token("#TenantName").with_attr("format", json!(1)),
                Node::text(" for "),
                Node::token("#UnitName"),
                Node::text(" at a monthly rent of "),
                Node::token("#RentAmount"),
                Node::text("."),
            ]),
            Node::paragraph(vec![Node::text("Literal #TenantName stays literal.")]),
        ])
    }

    #[test]
    fn empty_field_map_is_identity() {
        let tree = template();
        assert_eq!(resolve(&tree, &FieldMap::new()), tree);
    }

    #[test]
    fn resolves_known_fields_and_keeps_unknown_tokens() {
        let fm = fields(&[("TenantName", "Ama Mensah"), ("RentAmount", "GH₵2,500.00")]);
        let resolved = resolve(&template(), &fm);

        let para = &resolved.root.children()[0];
        let tenant = &para.children()[1];
        assert_eq!(tenant.kind, NodeKind::Text("Ama Mensah".to_string()));
        assert_eq!(tenant.attrs.get("format"), Some(&json!(1)));
        assert_eq!(para.children()[3].kind, NodeKind::Token("#UnitName".to_string()));
        assert_eq!(para.children()[5].kind, NodeKind::Text("GH₵2,500.00".to_string()));

        assert_eq!(unresolved_tokens(&resolved), vec!["UnitName".to_string()]);
    }

    #[test]
    fn empty_values_leave_token_in_place() {
        let resolved = resolve(&template(), &fields(&[("TenantName", "")]));
        assert_eq!(
            resolved.root.children()[0].children()[1].kind,
            NodeKind::Token("#TenantName".to_string())
        );
    }

    #[test]
    fn literal_text_is_never_treated_as_a_token() {
        let resolved = resolve(&template(), &fields(&[("TenantName", "Ama")]));
        assert_eq!(
            resolved.root.children()[1].children()[0].kind,
            NodeKind::Text("Literal #TenantName stays literal.".to_string())
        );
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let fm = fields(&[("TenantName", "#UnitName"), ("UnitName", "Flat 4B")]);
        let once = resolve(&template(), &fm);
        let twice = resolve(&once, &fm);
        assert_eq!(once, twice);
        // a value that looks like a token is still plain text
        assert_eq!(
            once.root.children()[0].children()[1].kind,
            NodeKind::Text("#UnitName".to_string())
        );
    }

    #[test]
    fn input_tree_is_not_mutated() {
        let tree = template();
        let snapshot = tree.to_json();
        let _ = resolve(&tree, &fields(&[("TenantName", "Ama"), ("UnitName", "4B")]));
        assert_eq!(tree.to_json(), snapshot);
    }

    #[test]
    fn trailing_text_after_marker_is_kept() {
        let tree = DocumentTree::new(vec![Node::paragraph(vec![Node::token("#TenantName's")])]);
        let resolved = resolve(&tree, &fields(&[("TenantName", "Ama")]));
        assert_eq!(
            resolved.root.children()[0].children()[0].kind,
            NodeKind::Text("Ama's".to_string())
        );
    }

    #[test]
    fn malformed_tokens_are_left_alone() {
        let tree = DocumentTree::new(vec![Node::token("TenantName"), Node::token("# Tenant")]);
        let resolved = resolve(&tree, &fields(&[("TenantName", "Ama")]));
        assert_eq!(resolved, tree);
        assert!(unresolved_tokens(&resolved).is_empty());
    }

    #[test]
    fn tokens_inside_opaque_nodes_are_untouched() {
        let json = r##"{"version":1,"root":{"type":"root","children":[
            {"type":"table","children":[{"type":"token","text":"#TenantName"}]}
        ]}}"##;
        let tree = DocumentTree::from_json(json).unwrap();
        let resolved = resolve(&tree, &fields(&[("TenantName", "Ama")]));
        assert_eq!(resolved.to_value(), tree.to_value());
    }
}
