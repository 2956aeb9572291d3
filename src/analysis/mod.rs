//! Grammar front-end and syntax-tree access.
//!
//! Every analysis pass in the crate goes through this layer:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌────────────────────────┐
//! │ Source bytes │────▶│ Language     │────▶│ ParsedFile (tree-sitter│
//! └──────────────┘     │ (grammar)    │     │ tree + source)         │
//!                      └──────────────┘     └────────────────────────┘
//!                                                      │
//!                 collect_descendants / direct_children│
//!                                                      ▼
//!            graph builder · scope analyzer · call-graph adapters
//! ```

mod language;
mod tree;

pub use language::Language;
pub use tree::{
    collect_descendants, direct_children, field_children, line_of, named_children, node_text,
    root_of, walk_pruned, ParsedFile, Span,
};
