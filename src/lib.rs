//! Select vault documents, filter them and apply bulk operations, keeping
//! every link to a moved document valid.
//!
//! Entry point is [`pipeline::PipelineExecutor`], wired with a [`ports::VaultFs`]
//! (usually [`storage::LocalVaultFs`]) and a [`ports::DocumentIndex`] (usually
//! [`index::VaultIndex`]).

pub mod config;
pub mod filter;
pub mod index;
pub mod links;
pub mod markdown;
pub mod models;
pub mod operations;
pub mod pipeline;
pub mod ports;
pub mod security;
pub mod selector;
pub mod storage;
pub mod utils;

pub use config::{RelocationConfig, VaultConfig};
pub use pipeline::{PipelineExecutor, PipelineResult, PipelineSpec};

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Defaults to `vault_pipeline=info`. Safe to call more than once; later
/// calls and calls made after the host installed its own subscriber do
/// nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vault_pipeline=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
