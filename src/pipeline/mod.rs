//! Pipeline Executor
//!
//! Runs a [`PipelineSpec`]: select documents, filter them, then preview or
//! apply each operation to each document in declaration order.
//!
//! ## Modules
//! - `spec` - the JSON input shape and its validation
//! - `result` - per-pair records and aggregate counts
//! - `executor` - the phase machine

pub mod executor;
pub mod result;
pub mod spec;

pub use executor::{PipelineError, PipelineExecutor};
pub use result::{
    OperationCounts, OperationRecord, OperationResults, PipelineOutput, PipelineResult,
    PipelineState,
};
pub use spec::{OutputFormat, OutputSpec, PipelineOptions, PipelineSpec};

pub use crate::selector::SelectionCriteria;
