//! Markdown helpers shared by the index, the link engine and operations.
//!
//! - `scanner` - line classifier tracking fenced code blocks and comments
//! - `frontmatter` - split, parse and render the YAML head of a document
//! - `tags` - frontmatter and inline `#tag` extraction

pub mod frontmatter;
pub mod scanner;
pub mod tags;

pub use frontmatter::*;
pub use scanner::*;
pub use tags::*;
