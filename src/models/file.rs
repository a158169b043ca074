use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stat result for a single vault path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStat {
    /// File size in bytes (0 for directories)
    pub size: u64,
    /// Last modified timestamp
    pub modified: DateTime<Utc>,
    /// Whether this is a directory
    pub is_directory: bool,
    /// Whether this is a file
    pub is_file: bool,
}

/// A single entry returned by a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Whether this is a directory
    pub is_directory: bool,
    /// Whether this is a symbolic link (never followed during scans)
    pub is_symlink: bool,
}

impl FileStat {
    /// Build a stat from std metadata
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let is_directory = metadata.is_dir();
        Self {
            size: if is_directory { 0 } else { metadata.len() },
            modified,
            is_directory,
            is_file: metadata.is_file(),
        }
    }
}
