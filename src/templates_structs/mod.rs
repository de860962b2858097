// Response bodies and Askama page contexts, organized by surface.
// Re-exported so handlers can `use crate::templates_structs::*`.

mod api;
mod sign;

pub use api::*;
pub use sign::*;
