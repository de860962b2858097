//! Read-only renderings of a document tree, used by the signing page and previews.

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde_json::Value;
use std::fmt::Write;

use super::tree::{ContainerKind, DocumentTree, Node, NodeKind};
use crate::models::signature::SignaturePlaceholder;

const FORMAT_BOLD: u64 = 1;
const FORMAT_ITALIC: u64 = 1 << 1;
const FORMAT_UNDERLINE: u64 = 1 << 3;

/// HTML body for the tree. All text is escaped; opaque nodes are not rendered.
pub fn to_html(tree: &DocumentTree) -> String {
    let mut out = String::new();
    for child in tree.root.children() {
        write_html(child, &mut out);
    }
    out
}

fn heading_tag(node: &Node) -> &'static str {
    match node.attrs.get("tag").and_then(Value::as_str) {
        Some("h1") => "h1",
        Some("h2") => "h2",
        Some("h4") => "h4",
        Some("h5") => "h5",
        Some("h6") => "h6",
        _ => "h3",
    }
}

fn list_tag(node: &Node) -> &'static str {
    match node.attrs.get("listType").and_then(Value::as_str) {
        Some("number") => "ol",
        _ => "ul",
    }
}

fn write_children(node: &Node, out: &mut String) {
    for child in node.children() {
        write_html(child, out);
    }
}

fn write_html(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Container { kind, .. } => {
            let tag = match kind {
                ContainerKind::Root | ContainerKind::Paragraph => "p",
                ContainerKind::Heading => heading_tag(node),
                ContainerKind::Quote => "blockquote",
                ContainerKind::List => list_tag(node),
                ContainerKind::ListItem => "li",
            };
            let _ = write!(out, "<{tag}>");
            write_children(node, out);
            let _ = write!(out, "</{tag}>");
        }
        NodeKind::Text(text) => {
            let format = node.attrs.get("format").and_then(Value::as_u64).unwrap_or(0);
            let tags: Vec<&str> = [(FORMAT_BOLD, "strong"), (FORMAT_ITALIC, "em"), (FORMAT_UNDERLINE, "u")]
                .into_iter()
                .filter(|(bit, _)| format & bit != 0)
                .map(|(_, tag)| tag)
                .collect();
            for tag in &tags {
                let _ = write!(out, "<{tag}>");
            }
            out.push_str(&encode_text(text));
            for tag in tags.iter().rev() {
                let _ = write!(out, "</{tag}>");
            }
        }
        NodeKind::LineBreak => out.push_str("<br>"),
        NodeKind::Token(text) => {
            let _ = write!(out, "<span class=\"unresolved-token\">{}</span>", encode_text(text));
        }
        NodeKind::Signature(p) => write_signature(p, out),
        NodeKind::Opaque(_) => {}
    }
}

// Phrasing content only, so a block can sit inside a paragraph.
fn write_signature(p: &SignaturePlaceholder, out: &mut String) {
    let _ = write!(
        out,
        "<span class=\"signature-block\" data-role=\"{}\"><span class=\"signature-label\">{}</span>",
        encode_double_quoted_attribute(p.role.as_str()),
        encode_text(&p.label)
    );
    if p.is_signed() {
        if let Some(image) = &p.signature_image_ref {
            let _ = write!(
                out,
                "<img class=\"signature-image\" src=\"{}\" alt=\"Signature\">",
                encode_double_quoted_attribute(image)
            );
        }
        let name = p.signed_by_name.as_deref().unwrap_or("");
        let date = p.signed_at.map(|t| t.format("%-d %B %Y").to_string()).unwrap_or_default();
        let _ = write!(
            out,
            "<span class=\"signature-meta\">Signed by {} on {}</span>",
            encode_text(name),
            date
        );
    } else {
        out.push_str("<span class=\"signature-pending\">Awaiting signature</span>");
    }
    out.push_str("</span>");
}

/// Plain text of the tree, blocks separated by a blank line.
pub fn to_plain_text(tree: &DocumentTree) -> String {
    let mut lines = Vec::new();
    for child in tree.root.children() {
        collect_lines(child, &mut lines);
    }
    lines.join("\n\n")
}

fn collect_lines(node: &Node, lines: &mut Vec<String>) {
    match &node.kind {
        NodeKind::Container { kind: ContainerKind::List | ContainerKind::Quote, children } => {
            for child in children {
                collect_lines(child, lines);
            }
        }
        NodeKind::Container { .. } => {
            let mut line = String::new();
            inline_text(node, &mut line);
            lines.push(line);
        }
        NodeKind::Signature(p) => {
            let state = match &p.signed_by_name {
                Some(name) if p.is_signed() => format!("signed by {name}"),
                _ => "unsigned".to_string(),
            };
            lines.push(format!("[{}: {}]", p.label, state));
        }
        _ => {
            let mut line = String::new();
            inline_text(node, &mut line);
            lines.push(line);
        }
    }
}

fn inline_text(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Text(text) | NodeKind::Token(text) => out.push_str(text),
        NodeKind::LineBreak => out.push('\n'),
        NodeKind::Container { children, .. } => {
            for child in children {
                inline_text(child, out);
            }
        }
        NodeKind::Signature(p) => out.push_str(&format!("[{}]", p.label)),
        NodeKind::Opaque(_) => {}
    }
}
