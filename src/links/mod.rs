//! Link parsing and the relocation engine that keeps links valid across moves.

pub mod parser;
pub mod relocation;

pub use parser::{extract_line_links, extract_links, Link, LinkKind};
pub use relocation::{
    apply_edits, FileReferences, LineEdit, LinkRelocator, RelocationError, RelocationReport,
};
