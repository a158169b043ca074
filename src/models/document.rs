use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::file::FileStat;

/// Metadata the index knows about a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// File stem (basename without extension)
    pub name: String,
    /// Last modified timestamp
    pub modified: DateTime<Utc>,
    /// File size in bytes
    pub size: u64,
    /// Parsed frontmatter
    #[serde(default)]
    pub frontmatter: Map<String, Value>,
    /// Tags from frontmatter and inline `#tags`, without the leading `#`
    #[serde(default)]
    pub tags: Vec<String>,
    /// Raw targets of outgoing links
    #[serde(default)]
    pub outgoing_links: Vec<String>,
    /// Absolute paths of documents linking here
    #[serde(default)]
    pub backlinks: Vec<String>,
}

/// A vault document, owned for the duration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Absolute path
    pub path: PathBuf,
    /// Full text; empty until loaded
    #[serde(default)]
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Minimal document for a file the index has not seen yet
    pub fn from_stat(path: &Path, stat: &FileStat) -> Self {
        Self {
            path: path.to_path_buf(),
            content: String::new(),
            metadata: DocumentMetadata {
                name: stem_of(path),
                modified: stat.modified,
                size: stat.size,
                frontmatter: Map::new(),
                tags: Vec::new(),
                outgoing_links: Vec::new(),
                backlinks: Vec::new(),
            },
        }
    }

    /// Directory containing this document
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name including extension
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Point this document at a new location after a move or rename
    pub fn relocate(&mut self, new_path: PathBuf) {
        self.metadata.name = stem_of(&new_path);
        self.path = new_path;
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stat_is_minimal() {
        let stat = FileStat {
            size: 42,
            modified: Utc::now(),
            is_directory: false,
            is_file: true,
        };
        let doc = Document::from_stat(Path::new("/vault/Notes/idea.md"), &stat);
        assert_eq!(doc.metadata.name, "idea");
        assert_eq!(doc.metadata.size, 42);
        assert!(doc.metadata.frontmatter.is_empty());
        assert!(doc.metadata.tags.is_empty());
        assert!(doc.content.is_empty());
        assert_eq!(doc.parent_dir(), Path::new("/vault/Notes"));
        assert_eq!(doc.file_name(), "idea.md");
    }

    #[test]
    fn test_relocate_updates_name() {
        let stat = FileStat {
            size: 1,
            modified: Utc::now(),
            is_directory: false,
            is_file: true,
        };
        let mut doc = Document::from_stat(Path::new("/vault/a.md"), &stat);
        doc.relocate(PathBuf::from("/vault/Archive/b.md"));
        assert_eq!(doc.metadata.name, "b");
        assert_eq!(doc.parent_dir(), Path::new("/vault/Archive"));
    }
}
