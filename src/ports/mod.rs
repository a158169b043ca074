//! Collaborator ports.
//!
//! The pipeline never touches the disk or the document index directly; it is
//! handed an `Arc<dyn VaultFs>` and an `Arc<dyn DocumentIndex>` and goes
//! through these narrow interfaces for every read and write.

pub mod filesystem;
pub mod index;

pub use filesystem::*;
pub use index::*;
