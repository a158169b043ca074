//! Vault configuration.
//!
//! Hosts usually build a [`VaultConfig`] themselves; [`VaultConfig::from_env`]
//! exists for tools and tests that want the `VAULT_*` environment variables
//! (a `.env` file is honoured via `dotenvy`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default trash folder, relative to the vault root
pub const DEFAULT_TRASH_DIR: &str = ".trash";

/// Default backup folder, relative to the vault root
pub const DEFAULT_BACKUP_DIR: &str = ".backups";

/// Configuration for the link relocation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelocationConfig {
    /// File extensions (no dot, lowercase) scanned for references
    pub extensions: Vec<String>,
    /// Vault-relative paths or folder names never scanned or rewritten
    pub exclude_paths: Vec<String>,
    /// Also fix relative links inside the moved file itself
    pub update_moved_file_links: bool,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude_paths: vec![
                ".git".to_string(),
                ".obsidian".to_string(),
                DEFAULT_TRASH_DIR.to_string(),
                DEFAULT_BACKUP_DIR.to_string(),
            ],
            update_moved_file_links: false,
        }
    }
}

impl RelocationConfig {
    /// Whether a file extension is eligible for scanning
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether a vault-relative slash path falls under an excluded path.
    ///
    /// Entries containing `/` match as path prefixes; bare names match any
    /// segment, so `.git` excludes nested repositories too.
    pub fn excludes(&self, relative: &str) -> bool {
        self.exclude_paths.iter().any(|excluded| {
            let excluded = excluded.trim_matches('/');
            if excluded.is_empty() {
                return false;
            }
            if excluded.contains('/') {
                relative == excluded || relative.starts_with(&format!("{}/", excluded))
            } else {
                relative.split('/').any(|segment| segment == excluded)
            }
        })
    }
}

/// Top-level vault configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Absolute root of the vault
    pub vault_root: PathBuf,
    /// Trash folder, relative to the vault root
    #[serde(default = "default_trash_dir")]
    pub trash_dir: String,
    /// Backup folder, relative to the vault root
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    #[serde(default)]
    pub relocation: RelocationConfig,
}

fn default_trash_dir() -> String {
    DEFAULT_TRASH_DIR.to_string()
}

fn default_backup_dir() -> String {
    DEFAULT_BACKUP_DIR.to_string()
}

impl VaultConfig {
    /// Config with defaults for everything but the root
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        Self {
            vault_root: vault_root.into(),
            trash_dir: default_trash_dir(),
            backup_dir: default_backup_dir(),
            relocation: RelocationConfig::default(),
        }
    }

    /// Read `VAULT_ROOT`, `VAULT_LINK_EXTENSIONS` and `VAULT_EXCLUDE_PATHS`
    ///
    /// Lists are comma separated. Returns `None` when `VAULT_ROOT` is unset.
    pub fn from_env() -> Option<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let root = std::env::var("VAULT_ROOT").ok()?;
        let mut config = Self::new(root);

        if let Ok(exts) = std::env::var("VAULT_LINK_EXTENSIONS") {
            let parsed = split_list(&exts)
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect::<Vec<_>>();
            if !parsed.is_empty() {
                config.relocation.extensions = parsed;
            }
        }
        if let Ok(excludes) = std::env::var("VAULT_EXCLUDE_PATHS") {
            config.relocation.exclude_paths = split_list(&excludes);
        }

        Some(config)
    }

    /// Absolute trash folder
    pub fn trash_root(&self) -> PathBuf {
        self.vault_root.join(&self.trash_dir)
    }

    /// Absolute backup folder
    pub fn backup_root(&self) -> PathBuf {
        self.vault_root.join(&self.backup_dir)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::new("/vault");
        assert_eq!(config.trash_root(), PathBuf::from("/vault/.trash"));
        assert_eq!(config.backup_root(), PathBuf::from("/vault/.backups"));
        assert!(config.relocation.accepts_extension("MD"));
        assert!(!config.relocation.accepts_extension("txt"));
        assert!(!config.relocation.update_moved_file_links);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: VaultConfig = serde_json::from_str(
            r#"{"vaultRoot": "/vault", "relocation": {"extensions": ["md", "markdown"]}}"#,
        )
        .unwrap();
        assert_eq!(config.trash_dir, ".trash");
        assert_eq!(config.relocation.extensions, vec!["md", "markdown"]);
        assert!(config.relocation.exclude_paths.contains(&".git".to_string()));
    }

    #[test]
    fn test_excludes() {
        let config = RelocationConfig {
            exclude_paths: vec![".git".to_string(), "Archive/old/".to_string()],
            ..RelocationConfig::default()
        };
        assert!(config.excludes(".git"));
        assert!(config.excludes("sub/.git/config"));
        assert!(config.excludes("Archive/old/a.md"));
        assert!(!config.excludes("Archive/older/a.md"));
        assert!(!config.excludes("Notes/a.md"));
    }

    #[test]
    fn test_from_env() {
        // Only test touching VAULT_* variables
        std::env::remove_var("VAULT_ROOT");
        assert!(VaultConfig::from_env().is_none());

        std::env::set_var("VAULT_ROOT", "/srv/notes");
        std::env::set_var("VAULT_LINK_EXTENSIONS", ".MD, markdown");
        std::env::set_var("VAULT_EXCLUDE_PATHS", "Archive, .git");
        let config = VaultConfig::from_env();
        std::env::remove_var("VAULT_ROOT");
        std::env::remove_var("VAULT_LINK_EXTENSIONS");
        std::env::remove_var("VAULT_EXCLUDE_PATHS");

        let config = config.unwrap();
        assert_eq!(config.vault_root, PathBuf::from("/srv/notes"));
        assert_eq!(config.relocation.extensions, vec!["md", "markdown"]);
        assert_eq!(config.relocation.exclude_paths, vec!["Archive", ".git"]);
        assert_eq!(config.trash_dir, DEFAULT_TRASH_DIR);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" md, .markdown ,,"), vec!["md", ".markdown"]);
    }
}
