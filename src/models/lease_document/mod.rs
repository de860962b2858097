pub mod lifecycle;
pub mod queries;
pub mod render;
pub mod tree;
pub mod types;
pub mod workflow;

pub use lifecycle::DocumentStatus;
pub use tree::{DocumentTree, Node, NodeKind, NodePath};
pub use types::*;
