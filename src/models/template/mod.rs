use std::collections::BTreeMap;

pub mod fields;
pub mod resolver;
pub mod words;

pub use fields::*;
pub use resolver::*;
pub use words::*;

/// Field name (without the leading `#`) to literal replacement text.
pub type FieldMap = BTreeMap<String, String>;
