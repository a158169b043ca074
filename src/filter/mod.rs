//! Document filtering.
//!
//! - `ast` - condition types and the predicates phrases compile to
//! - `expression` - natural-language date and size parsing
//! - `evaluator` - per-document evaluation and AND/OR combination

pub mod ast;
pub mod evaluator;
pub mod expression;

pub use ast::*;
pub use evaluator::*;
pub use expression::*;
