//! Local-disk storage adapter.
//!
//! ## Modules
//! - `io` - Safe I/O utilities (atomic writes, fsync, symlink detection)
//! - `local` - `VaultFs` implementation on top of `tokio::fs`

pub mod io;
pub mod local;

pub use io::{atomic_write, is_symlink, move_file};
pub use local::LocalVaultFs;
