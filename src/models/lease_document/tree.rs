//! Serialized lease document tree.
//!
//! Content is stored as `{"version": 1, "root": {...}}` where every node is a JSON
//! object discriminated by `type`. Node kinds this crate understands are parsed into
//! [`NodeKind`]; their remaining attributes (`format`, `indent`, `direction`, ...) are
//! kept in [`Node::attrs`] and written back unchanged. Any other node type is held as
//! [`NodeKind::Opaque`] and never looked into, so documents authored by a newer editor
//! survive a resolve or stamp pass untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::models::signature::{SignaturePlaceholder, SignatureRole};

pub const CURRENT_VERSION: u32 = 1;

/// Signature node keys held in [`SignaturePlaceholder`] rather than in `attrs`.
pub const SIGNATURE_FIELDS: [&str; 4] = ["label", "signatureImageRef", "signedByName", "signedAt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Root,
    Paragraph,
    Heading,
    Quote,
    List,
    ListItem,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Root => "root",
            ContainerKind::Paragraph => "paragraph",
            ContainerKind::Heading => "heading",
            ContainerKind::Quote => "quote",
            ContainerKind::List => "list",
            ContainerKind::ListItem => "listitem",
        }
    }

    fn from_type(node_type: &str) -> Option<Self> {
        match node_type {
            "root" => Some(ContainerKind::Root),
            "paragraph" => Some(ContainerKind::Paragraph),
            "heading" => Some(ContainerKind::Heading),
            "quote" => Some(ContainerKind::Quote),
            "list" => Some(ContainerKind::List),
            "listitem" => Some(ContainerKind::ListItem),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container { kind: ContainerKind, children: Vec<Node> },
    Text(String),
    LineBreak,
    /// Unresolved template field, text of the form `#FieldName`.
    Token(String),
    Signature(SignaturePlaceholder),
    /// Unknown node type, kept byte-for-byte as it was read.
    Opaque(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Node {
    pub kind: NodeKind,
    pub attrs: Map<String, Value>,
}

impl Node {
    fn bare(kind: NodeKind) -> Self {
        Node { kind, attrs: Map::new() }
    }

    pub fn container(kind: ContainerKind, children: Vec<Node>) -> Self {
        Node::bare(NodeKind::Container { kind, children })
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::container(ContainerKind::Paragraph, children)
    }

    pub fn text(text: &str) -> Self {
        Node::bare(NodeKind::Text(text.to_string()))
    }

    pub fn token(text: &str) -> Self {
        Node::bare(NodeKind::Token(text.to_string()))
    }

    pub fn signature(placeholder: SignaturePlaceholder) -> Self {
        Node::bare(NodeKind::Signature(placeholder))
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn node_type(&self) -> &str {
        match &self.kind {
            NodeKind::Container { kind, .. } => kind.as_str(),
            NodeKind::Text(_) => "text",
            NodeKind::LineBreak => "linebreak",
            NodeKind::Token(_) => "token",
            NodeKind::Signature(_) => "signature",
            NodeKind::Opaque(value) => value.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Container { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&SignaturePlaceholder> {
        match &self.kind {
            NodeKind::Signature(p) => Some(p),
            _ => None,
        }
    }

    /// Pre-order mutable visit of this node and all of its descendants.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                child.walk_mut(f);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    Malformed(String),
    UnsupportedVersion(u32),
    RootMissing,
    NestedRoot(NodePath),
    DuplicateRole(SignatureRole),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::Malformed(msg) => write!(f, "Malformed document content: {msg}"),
            TreeError::UnsupportedVersion(v) => {
                write!(f, "Document format version {v} is newer than supported version {CURRENT_VERSION}")
            }
            TreeError::RootMissing => write!(f, "Document content must have a single root node"),
            TreeError::NestedRoot(path) => write!(f, "Root node found below the top level at {path}"),
            TreeError::DuplicateRole(role) => {
                write!(f, "Only one signature placeholder per role is allowed ({role} appears twice)")
            }
        }
    }
}

impl std::error::Error for TreeError {}

impl From<TreeError> for crate::errors::AppError {
    fn from(e: TreeError) -> Self {
        crate::errors::AppError::Validation(e.to_string())
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str, node_type: &str) -> Result<String, TreeError> {
    match obj.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TreeError::Malformed(format!("`{key}` of a {node_type} node must be a string"))),
        None => Err(TreeError::Malformed(format!("{node_type} node is missing `{key}`"))),
    }
}

impl TryFrom<Value> for Node {
    type Error = TreeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut obj) = value else {
            return Err(TreeError::Malformed("node must be a JSON object".to_string()));
        };
        let node_type = match obj.get("type") {
            Some(Value::String(t)) => t.clone(),
            _ => return Err(TreeError::Malformed("node is missing a string `type`".to_string())),
        };

        let kind = if let Some(kind) = ContainerKind::from_type(&node_type) {
            obj.remove("type");
            let children = match obj.remove("children") {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(Node::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(TreeError::Malformed(format!("`children` of a {node_type} node must be an array")));
                }
                None => Vec::new(),
            };
            NodeKind::Container { kind, children }
        } else {
            match node_type.as_str() {
                "text" => {
                    obj.remove("type");
                    NodeKind::Text(take_string(&mut obj, "text", "text")?)
                }
                "linebreak" => {
                    obj.remove("type");
                    NodeKind::LineBreak
                }
                "token" => {
                    obj.remove("type");
                    NodeKind::Token(take_string(&mut obj, "text", "token")?)
                }
                "signature" => {
                    let placeholder: SignaturePlaceholder = serde_json::from_value(Value::Object(obj.clone()))
                        .map_err(|e| TreeError::Malformed(format!("signature node: {e}")))?;
                    obj.remove("type");
                    obj.remove("role");
                    // Null or empty keys stay in attrs so they are written back as read
                    for field in SIGNATURE_FIELDS {
                        let carried = match obj.get(field) {
                            Some(Value::Null) => false,
                            Some(Value::String(s)) => !s.is_empty(),
                            Some(_) => true,
                            None => false,
                        };
                        if carried {
                            obj.remove(field);
                        }
                    }
                    NodeKind::Signature(placeholder)
                }
                _ => return Ok(Node::bare(NodeKind::Opaque(Value::Object(obj)))),
            }
        };

        Ok(Node { kind, attrs: obj })
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        let mut obj = node.attrs.clone();
        let node_type = match &node.kind {
            NodeKind::Container { kind, children } => {
                obj.insert("children".to_string(), Value::Array(children.iter().map(Value::from).collect()));
                kind.as_str()
            }
            NodeKind::Text(text) => {
                obj.insert("text".to_string(), Value::String(text.clone()));
                "text"
            }
            NodeKind::LineBreak => "linebreak",
            NodeKind::Token(text) => {
                obj.insert("text".to_string(), Value::String(text.clone()));
                "token"
            }
            NodeKind::Signature(p) => {
                obj.insert("role".to_string(), Value::String(p.role.as_str().to_string()));
                if !p.label.is_empty() {
                    obj.insert("label".to_string(), Value::String(p.label.clone()));
                }
                if let Some(image) = &p.signature_image_ref {
                    obj.insert("signatureImageRef".to_string(), Value::String(image.clone()));
                }
                if let Some(name) = &p.signed_by_name {
                    obj.insert("signedByName".to_string(), Value::String(name.clone()));
                }
                if let Some(t) = p.signed_at {
                    obj.insert(
                        "signedAt".to_string(),
                        Value::String(t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
                    );
                }
                "signature"
            }
            NodeKind::Opaque(value) => return value.clone(),
        };
        obj.insert("type".to_string(), Value::String(node_type.to_string()));
        Value::Object(obj)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::from(&node)
    }
}

/// Position of a node: child indices walked from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        NodePath(path)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Depth-first, pre-order traversal. Opaque nodes are yielded but not entered.
pub struct Nodes<'a> {
    stack: Vec<(&'a Node, NodePath)>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = (&'a Node, NodePath);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, path) = self.stack.pop()?;
        for (i, child) in node.children().iter().enumerate().rev() {
            self.stack.push((child, path.child(i)));
        }
        Some((node, path))
    }
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    #[serde(default = "default_version")]
    pub version: u32,
    pub root: Node,
}

impl Default for DocumentTree {
    fn default() -> Self {
        DocumentTree::new(Vec::new())
    }
}

impl DocumentTree {
    pub fn new(children: Vec<Node>) -> Self {
        DocumentTree {
            version: CURRENT_VERSION,
            root: Node::container(ContainerKind::Root, children),
        }
    }

    /// Parse stored content and check its structure.
    pub fn from_json(s: &str) -> Result<Self, TreeError> {
        let tree: DocumentTree = serde_json::from_str(s).map_err(|e| TreeError::Malformed(e.to_string()))?;
        tree.check_structure()?;
        Ok(tree)
    }

    /// Same as [`DocumentTree::from_json`] for content already parsed as JSON.
    pub fn from_value(value: Value) -> Result<Self, TreeError> {
        let tree: DocumentTree = serde_json::from_value(value).map_err(|e| TreeError::Malformed(e.to_string()))?;
        tree.check_structure()?;
        Ok(tree)
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("version".to_string(), Value::from(self.version));
        obj.insert("root".to_string(), Value::from(&self.root));
        Value::Object(obj)
    }

    fn check_structure(&self) -> Result<(), TreeError> {
        if self.version > CURRENT_VERSION {
            return Err(TreeError::UnsupportedVersion(self.version));
        }
        match &self.root.kind {
            NodeKind::Container { kind: ContainerKind::Root, .. } => {}
            _ => return Err(TreeError::RootMissing),
        }
        for (node, path) in self.nodes_with_paths().skip(1) {
            if let NodeKind::Container { kind: ContainerKind::Root, .. } = node.kind {
                return Err(TreeError::NestedRoot(path));
            }
        }
        Ok(())
    }

    /// Full validation applied whenever content is written: structure plus
    /// at most one placeholder per signature role.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.check_structure()?;
        let mut seen = BTreeSet::new();
        for node in self.nodes() {
            if let Some(p) = node.as_signature() {
                if !seen.insert(p.role) {
                    return Err(TreeError::DuplicateRole(p.role));
                }
            }
        }
        Ok(())
    }

    pub fn nodes_with_paths(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![(&self.root, NodePath::root())],
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_with_paths().map(|(node, _)| node)
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        path.0
            .iter()
            .try_fold(&self.root, |node, &i| node.children().get(i))
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for &i in &path.0 {
            node = node.children_mut()?.get_mut(i)?;
        }
        Some(node)
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        self.root.walk_mut(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> Value {
        json!({
            "version": 1,
            "root": {
                "type": "root",
                "direction": "ltr",
                "children": [
                    {
                        "type": "heading",
                        "tag": "h1",
                        "children": [{"type": "text", "text": "Tenancy Agreement", "format": 1}]
                    },
                    {
                        "type": "paragraph",
                        "indent": 0,
                        "children": [
                            {"type": "text", "text": "This lease is between "},
                            {"type": "token", "text": "#TenantName", "format": 0},
                            {"type": "equation", "equation": "x^2", "inline": true}
                        ]
                    },
                    {
                        "type": "signature",
                        "role": "TENANT",
                        "label": "Tenant",
                        "signatureImageRef": null,
                        "signedByName": null,
                        "signedAt": null,
                        "version": 1
                    }
                ]
            }
        })
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let original = sample_json();
        let tree = DocumentTree::from_json(&original.to_string()).unwrap();
        assert_eq!(tree.to_value(), original);
    }

    #[test]
    fn sparse_signature_node_is_written_back_as_read() {
        let original = json!({
            "version": 1,
            "root": {"type": "root", "children": [
                {"type": "signature", "role": "PROPERTY_MANAGER"},
                {"type": "signature", "role": "TENANT", "label": "", "signedAt": null}
            ]}
        });
        let tree = DocumentTree::from_value(original.clone()).unwrap();
        assert_eq!(tree.to_value(), original);
    }

    #[test]
    fn unknown_nodes_are_opaque() {
        let tree = DocumentTree::from_json(&sample_json().to_string()).unwrap();
        let opaque = tree
            .nodes()
            .find(|n| n.node_type() == "equation")
            .expect("equation node kept");
        assert!(matches!(opaque.kind, NodeKind::Opaque(_)));
    }

    #[test]
    fn traversal_visits_every_node_once_in_document_order() {
        let tree = DocumentTree::from_json(&sample_json().to_string()).unwrap();
        let types: Vec<&str> = tree.nodes().map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec!["root", "heading", "text", "paragraph", "text", "token", "equation", "signature"]
        );
    }

    #[test]
    fn paths_address_nodes() {
        let tree = DocumentTree::from_json(&sample_json().to_string()).unwrap();
        for (node, path) in tree.nodes_with_paths() {
            assert_eq!(tree.node_at(&path), Some(node));
        }
        assert_eq!(tree.node_at(&NodePath(vec![1, 1])).map(|n| n.node_type()), Some("token"));
        assert!(tree.node_at(&NodePath(vec![9])).is_none());
        assert_eq!(NodePath(vec![1, 1]).to_string(), "/1/1");
    }

    #[test]
    fn clone_does_not_alias() {
        let tree = DocumentTree::from_json(&sample_json().to_string()).unwrap();
        let mut copy = tree.clone();
        copy.walk_mut(&mut |node| {
            if let NodeKind::Text(text) = &mut node.kind {
                text.push_str(" (edited)");
            }
        });
        assert_ne!(copy, tree);
        assert_eq!(tree.to_value(), sample_json());
    }

    #[test]
    fn missing_version_defaults_to_current() {
        let tree = DocumentTree::from_json(r#"{"root":{"type":"root","children":[]}}"#).unwrap();
        assert_eq!(tree.version, CURRENT_VERSION);
    }

    #[test]
    fn newer_version_is_rejected() {
        let err = DocumentTree::from_json(r#"{"version":7,"root":{"type":"root","children":[]}}"#).unwrap_err();
        assert_eq!(err, TreeError::UnsupportedVersion(7));
    }

    #[test]
    fn root_must_be_a_root_container() {
        let err = DocumentTree::from_json(r#"{"root":{"type":"paragraph","children":[]}}"#).unwrap_err();
        assert_eq!(err, TreeError::RootMissing);

        let err = DocumentTree::from_json(
            r#"{"root":{"type":"root","children":[{"type":"root","children":[]}]}}"#,
        )
        .unwrap_err();
        assert_eq!(err, TreeError::NestedRoot(NodePath(vec![0])));
    }

    #[test]
    fn malformed_nodes_are_rejected() {
        assert!(matches!(
            DocumentTree::from_json(r#"{"root":{"type":"root","children":[{"text":"no type"}]}}"#),
            Err(TreeError::Malformed(_))
        ));
        assert!(matches!(
            DocumentTree::from_json(r#"{"root":{"type":"root","children":[{"type":"token"}]}}"#),
            Err(TreeError::Malformed(_))
        ));
        assert!(matches!(
            DocumentTree::from_json(
                r#"{"root":{"type":"root","children":[{"type":"signature","role":"LANDLORD"}]}}"#
            ),
            Err(TreeError::Malformed(_))
        ));
        assert!(matches!(DocumentTree::from_json("not json"), Err(TreeError::Malformed(_))));
    }

    #[test]
    fn validate_rejects_duplicate_roles() {
        let tree = DocumentTree::new(vec![
            Node::signature(SignaturePlaceholder::unsigned(SignatureRole::Tenant, "Tenant")),
            Node::paragraph(vec![Node::signature(SignaturePlaceholder::unsigned(
                SignatureRole::Tenant,
                "Tenant again",
            ))]),
        ]);
        assert_eq!(tree.validate(), Err(TreeError::DuplicateRole(SignatureRole::Tenant)));
    }
}
