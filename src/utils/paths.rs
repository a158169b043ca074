//! Path helpers for vault-relative and link-relative path arithmetic.
//!
//! Links inside documents always use `/` separators regardless of the host
//! platform, so everything that produces link text goes through the slash
//! form helpers here.

use std::path::{Component, Path, PathBuf};

/// Whether `path` is already absolute.
///
/// Recognizes POSIX roots (`/vault`), UNC / backslash roots (`\\server`) and
/// Windows drive letters (`C:\vault`, `C:/vault`) on every platform, since
/// vault paths may come from a different host than the one running us.
pub fn is_absolute_path(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Resolve a user supplied path against the vault root unless it is absolute.
pub fn resolve_in_vault(vault_root: &Path, path: &str) -> PathBuf {
    if is_absolute_path(path) {
        normalize(Path::new(path))
    } else {
        normalize(&vault_root.join(path))
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into their parent.
///
/// Does not touch the filesystem, so it works for paths that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Join path components with `/`, ignoring the root.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Vault-relative slash form of `path`, or `None` when it lies outside the vault.
pub fn vault_relative(vault_root: &Path, path: &Path) -> Option<String> {
    normalize(path)
        .strip_prefix(normalize(vault_root))
        .ok()
        .map(to_slash)
}

/// Slash-separated path leading from directory `from_dir` to `to`.
///
/// Both inputs are normalized first. Returns `.` when they are equal.
pub fn relative_slash_path(from_dir: &Path, to: &Path) -> String {
    let from = normalize(from_dir);
    let to = normalize(to);
    let from_parts: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        parts.push("..".to_string());
    }
    for part in &to_parts[common..] {
        parts.push(part.as_os_str().to_string_lossy().to_string());
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Strip the extension from the last segment of a slash path.
///
/// `Tasks/task1.md` becomes `Tasks/task1`; dots in directory names are left alone.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Whether the last segment of a slash path carries an extension.
pub fn has_extension(path: &str) -> bool {
    strip_extension(path).len() != path.len()
}

/// Last segment of a slash path.
pub fn slash_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
