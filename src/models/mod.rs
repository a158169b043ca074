//! Data model shared by the selector, filters, operations and ports.

pub mod document;
pub mod file;

pub use document::*;
pub use file::*;
