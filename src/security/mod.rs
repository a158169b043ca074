use std::path::Path;

use crate::utils::normalize;

/// Vault directories that bulk operations must never touch directly.
const PROTECTED_DIRS: &[&str] = &[".git", ".obsidian"];

/// Security validator for vault path operations
pub struct PathValidator;

impl PathValidator {
    /// Check that `path` lies inside `vault_root` (lexically, after normalization)
    pub fn is_within_vault(vault_root: &Path, path: &Path) -> bool {
        let root = normalize(vault_root);
        let check_path = normalize(path);
        check_path != root && check_path.starts_with(&root)
    }

    /// Check if a path is protected and should not be modified
    ///
    /// The vault root itself and anything under a tool directory like `.git`
    /// or `.obsidian` is protected.
    pub fn is_protected_path(vault_root: &Path, path: &Path) -> bool {
        let root = normalize(vault_root);
        let check_path = normalize(path);

        if check_path == root {
            return true;
        }

        match check_path.strip_prefix(&root) {
            Ok(relative) => relative
                .components()
                .next()
                .map(|first| {
                    let first = first.as_os_str().to_string_lossy();
                    PROTECTED_DIRS.iter().any(|p| *p == first)
                })
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_vault() {
        let root = Path::new("/vault");
        assert!(PathValidator::is_within_vault(root, Path::new("/vault/a.md")));
        assert!(PathValidator::is_within_vault(root, Path::new("/vault/x/../a.md")));
        assert!(!PathValidator::is_within_vault(root, Path::new("/vault/../etc/passwd")));
        assert!(!PathValidator::is_within_vault(root, Path::new("/vault")));
        assert!(!PathValidator::is_within_vault(root, Path::new("/vault2/a.md")));
    }

    #[test]
    fn test_protected_paths() {
        let root = Path::new("/vault");
        assert!(PathValidator::is_protected_path(root, Path::new("/vault")));
        assert!(PathValidator::is_protected_path(root, Path::new("/vault/.git/config")));
        assert!(PathValidator::is_protected_path(root, Path::new("/vault/.obsidian/app.json")));
        assert!(!PathValidator::is_protected_path(root, Path::new("/vault/Notes/.git.md")));
        assert!(!PathValidator::is_protected_path(root, Path::new("/vault/Notes/a.md")));
    }
}
