//! Link Relocation Engine
//!
//! Keeps cross-document references valid when a document moves. For a move
//! `old -> new` the engine:
//! 1. Lists every eligible file in the vault (sequential directory walk)
//! 2. Extracts links line by line, skipping fenced code and comments
//! 3. Keeps the links whose target resolves to `old`
//! 4. Rewrites each target span in the style of the original link
//!
//! Nothing is cached: every call re-reads the vault.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::parser::{extract_links, Link, LinkKind};
use crate::config::RelocationConfig;
use crate::ports::{FsError, VaultFs};
use crate::security::PathValidator;
use crate::utils::{
    normalize, relative_slash_path, slash_basename, strip_extension, vault_relative,
};

/// Errors that can occur during relocation
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum RelocationError {
    /// Reading or writing a vault file failed
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The moved path is not inside the vault
    #[error("Path is outside the vault: {0}")]
    OutsideVault(String),
}

/// Links in one file that point at a given target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReferences {
    pub file_path: PathBuf,
    pub links: Vec<Link>,
}

/// Outcome of rewriting references after a move
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocationReport {
    pub files_updated: usize,
    pub links_updated: usize,
    pub files: Vec<PathBuf>,
}

/// A single position-indexed replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// 1-based line number
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// The different spellings of one document's location
#[derive(Debug, Clone)]
struct TargetForms {
    absolute: PathBuf,
    absolute_no_ext: PathBuf,
    vault_rel: String,
    vault_rel_no_ext: String,
    basename: String,
    basename_no_ext: String,
    extension: Option<String>,
}

impl TargetForms {
    fn new(vault_root: &Path, path: &Path) -> Result<Self, RelocationError> {
        let absolute = normalize(path);
        let vault_rel = vault_relative(vault_root, &absolute)
            .filter(|_| PathValidator::is_within_vault(vault_root, &absolute))
            .ok_or_else(|| RelocationError::OutsideVault(path.display().to_string()))?;
        let vault_rel_no_ext = strip_extension(&vault_rel).to_string();
        let basename = slash_basename(&vault_rel).to_string();
        let basename_no_ext = strip_extension(&basename).to_string();

        Ok(Self {
            absolute_no_ext: absolute.with_extension(""),
            extension: absolute
                .extension()
                .map(|e| e.to_string_lossy().to_string()),
            absolute,
            vault_rel,
            vault_rel_no_ext,
            basename,
            basename_no_ext,
        })
    }

    fn matches_absolute(&self, resolved: &Path) -> bool {
        resolved == self.absolute || resolved == self.absolute_no_ext
    }
}

/// Rewrites references when documents move
pub struct LinkRelocator {
    vault_root: PathBuf,
    fs: Arc<dyn VaultFs>,
    config: RelocationConfig,
}

impl LinkRelocator {
    pub fn new(
        vault_root: impl Into<PathBuf>,
        fs: Arc<dyn VaultFs>,
        config: RelocationConfig,
    ) -> Self {
        Self {
            vault_root: normalize(&vault_root.into()),
            fs,
            config,
        }
    }

    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }

    /// Find every file linking to `target`
    pub async fn find_references(
        &self,
        target: &Path,
    ) -> Result<Vec<FileReferences>, RelocationError> {
        let scanned = self.scan(target, &[normalize(target)]).await?;
        Ok(scanned
            .into_iter()
            .map(|(file_path, _, links)| FileReferences { file_path, links })
            .collect())
    }

    /// Read each candidate once and keep `(path, content, matching links)`
    async fn scan(
        &self,
        target: &Path,
        skip: &[PathBuf],
    ) -> Result<Vec<(PathBuf, String, Vec<Link>)>, RelocationError> {
        let forms = TargetForms::new(&self.vault_root, target)?;
        let candidates = self.candidate_files(skip).await?;
        let mut references = Vec::new();

        for file in candidates {
            let content = match self.fs.read_file(&file).await {
                Ok(content) => content,
                Err(e) => {
                    // A file vanishing mid-scan is not fatal for the other files
                    tracing::warn!(path = %file.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            let source_dir = file.parent().unwrap_or(&self.vault_root).to_path_buf();
            let links: Vec<Link> = extract_links(&content)
                .into_iter()
                .filter(|link| self.link_points_to(link, &source_dir, &forms))
                .collect();

            if !links.is_empty() {
                references.push((file, content, links));
            }
        }

        Ok(references)
    }

    /// Rewrite every reference to `old_path` so it points at `new_path`.
    ///
    /// Call after the file has been moved; both locations are excluded from
    /// the scan.
    pub async fn update_references(
        &self,
        old_path: &Path,
        new_path: &Path,
    ) -> Result<RelocationReport, RelocationError> {
        let new_forms = TargetForms::new(&self.vault_root, new_path)?;
        let old_forms = TargetForms::new(&self.vault_root, old_path)?;
        let references = self
            .scan(old_path, &[normalize(old_path), normalize(new_path)])
            .await?;

        let mut report = RelocationReport::default();

        for (file_path, content, links) in references {
            let source_dir = file_path.parent().unwrap_or(&self.vault_root).to_path_buf();

            let edits: Vec<LineEdit> = links
                .iter()
                .map(|link| LineEdit {
                    line: link.line,
                    start: link.target_start,
                    end: link.target_end,
                    replacement: self.replacement_target(
                        link,
                        &source_dir,
                        &old_forms,
                        &new_forms,
                    ),
                })
                .collect();

            let updated = apply_edits(&content, &edits);
            if updated == content {
                continue;
            }

            self.fs.write_file(&file_path, &updated).await?;
            tracing::info!(
                path = %file_path.display(),
                links = edits.len(),
                "Rewrote links"
            );

            report.files_updated += 1;
            report.links_updated += edits.len();
            report.files.push(file_path);
        }

        if self.config.update_moved_file_links {
            let own = self.rewrite_own_links(old_path, new_path).await?;
            if own > 0 {
                report.files_updated += 1;
                report.links_updated += own;
                report.files.push(normalize(new_path));
            }
        }

        Ok(report)
    }

    /// Fix location-dependent links inside a file that moved from `old_path`
    /// to `new_path`. Returns the number of links rewritten.
    pub async fn rewrite_own_links(
        &self,
        old_path: &Path,
        new_path: &Path,
    ) -> Result<usize, RelocationError> {
        let new_path = normalize(new_path);
        let old_dir = normalize(old_path.parent().unwrap_or(&self.vault_root));
        let new_dir = new_path.parent().unwrap_or(&self.vault_root).to_path_buf();
        if old_dir == new_dir {
            return Ok(0);
        }

        let content = self.fs.read_file(&new_path).await?;
        let mut edits = Vec::new();

        for link in extract_links(&content) {
            if link.is_external() || !is_location_dependent(&link) {
                continue;
            }
            let resolved = resolve_link_path(&self.vault_root, &old_dir, &link);
            let replacement = relative_slash_path(&new_dir, &resolved);
            let replacement = match link.kind {
                LinkKind::MarkdownLink => restyle_markdown_path(&link.target, replacement),
                LinkKind::Wikilink => keep_dot_prefix(link.target.trim(), replacement),
            };
            if replacement != link.target {
                edits.push(LineEdit {
                    line: link.line,
                    start: link.target_start,
                    end: link.target_end,
                    replacement,
                });
            }
        }

        if edits.is_empty() {
            return Ok(0);
        }

        let updated = apply_edits(&content, &edits);
        self.fs.write_file(&new_path, &updated).await?;
        tracing::info!(
            path = %new_path.display(),
            links = edits.len(),
            "Rewrote links in moved file"
        );
        Ok(edits.len())
    }

    /// Every eligible file under the vault, in deterministic order
    async fn candidate_files(&self, skip: &[PathBuf]) -> Result<Vec<PathBuf>, RelocationError> {
        let mut files = Vec::new();
        let mut pending = vec![self.vault_root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = self.fs.read_dir(&dir).await?;
            for entry in entries {
                if entry.is_symlink || self.is_excluded(&entry.path) {
                    continue;
                }
                if entry.is_directory {
                    pending.push(entry.path);
                    continue;
                }
                let eligible = entry
                    .path
                    .extension()
                    .map(|ext| self.config.accepts_extension(&ext.to_string_lossy()))
                    .unwrap_or(false);
                if eligible && !skip.iter().any(|s| *s == normalize(&entry.path)) {
                    files.push(entry.path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match vault_relative(&self.vault_root, path) {
            Some(relative) => self.config.excludes(&relative),
            None => true,
        }
    }

    fn link_points_to(&self, link: &Link, source_dir: &Path, forms: &TargetForms) -> bool {
        match link.kind {
            LinkKind::Wikilink => wikilink_points_to(link, source_dir, forms),
            LinkKind::MarkdownLink => {
                if link.is_external() {
                    return false;
                }
                let resolved = resolve_link_path(&self.vault_root, source_dir, link);
                forms.matches_absolute(&resolved)
            }
        }
    }

    /// New target text for `link`, styled after the original
    fn replacement_target(
        &self,
        link: &Link,
        source_dir: &Path,
        old: &TargetForms,
        new: &TargetForms,
    ) -> String {
        let keep_ext = old
            .extension
            .as_ref()
            .map(|ext| {
                link.target
                    .to_lowercase()
                    .ends_with(&format!(".{}", ext.to_lowercase()))
            })
            .unwrap_or(false);

        let relative = if keep_ext {
            relative_slash_path(source_dir, &new.absolute)
        } else {
            relative_slash_path(source_dir, &new.absolute_no_ext)
        };

        match link.kind {
            LinkKind::Wikilink => {
                let target = link.target.trim();
                if is_relative_shaped(target) || !target.contains('/') {
                    keep_dot_prefix(target, relative)
                } else if keep_ext {
                    new.vault_rel.clone()
                } else {
                    new.vault_rel_no_ext.clone()
                }
            }
            LinkKind::MarkdownLink => restyle_markdown_path(&link.target, relative),
        }
    }
}

fn is_relative_shaped(target: &str) -> bool {
    target.starts_with("./") || target.starts_with("../")
}

/// Links whose meaning changes when the containing file moves
fn is_location_dependent(link: &Link) -> bool {
    match link.kind {
        LinkKind::Wikilink => is_relative_shaped(link.target.trim()),
        LinkKind::MarkdownLink => !link.target.starts_with('/'),
    }
}

/// Decode a markdown destination (`%20` etc.); fall back to the raw text
fn decode_target(target: &str) -> String {
    urlencoding::decode(target)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| target.to_string())
        .replace('\\', "/")
}

/// Absolute path a location-based link resolves to
fn resolve_link_path(vault_root: &Path, source_dir: &Path, link: &Link) -> PathBuf {
    let target = match link.kind {
        LinkKind::MarkdownLink => decode_target(&link.target),
        LinkKind::Wikilink => link.target.trim().replace('\\', "/"),
    };
    if let Some(rooted) = target.strip_prefix('/') {
        normalize(&vault_root.join(rooted))
    } else {
        normalize(&source_dir.join(target))
    }
}

/// Re-add a leading `./` when the original had one and the new path stays below
fn keep_dot_prefix(original: &str, relative: String) -> String {
    if original.starts_with("./") && !relative.starts_with("../") {
        format!("./{}", relative)
    } else {
        relative
    }
}

/// Keep a leading `./` and percent-encoded spaces when the original had them
fn restyle_markdown_path(original: &str, relative: String) -> String {
    let mut relative = keep_dot_prefix(original, relative);
    if original.contains("%20") {
        relative = relative.replace(' ', "%20");
    }
    relative
}

fn wikilink_points_to(link: &Link, source_dir: &Path, forms: &TargetForms) -> bool {
    let target = link.target.trim().replace('\\', "/");

    if is_relative_shaped(&target) {
        let resolved = normalize(&source_dir.join(&target));
        return forms.matches_absolute(&resolved);
    }

    let target = target.trim_start_matches('/');

    // 1. Exact vault-relative match
    if target == forms.vault_rel || target == forms.vault_rel_no_ext {
        return true;
    }

    // 2. Basename match for short-form links
    if !target.contains('/') {
        return target == forms.basename || target == forms.basename_no_ext;
    }

    // 3. Path suffix on a segment boundary: `2024/task1` -> `Archive/2024/task1`
    let suffix = format!("/{}", target);
    forms.vault_rel.ends_with(&suffix) || forms.vault_rel_no_ext.ends_with(&suffix)
}

/// Apply position-indexed edits, right to left on each line, bottom to top.
///
/// Line endings (`\n` or `\r\n`) are preserved exactly.
pub fn apply_edits(content: &str, edits: &[LineEdit]) -> String {
    if edits.is_empty() {
        return content.to_string();
    }

    let mut lines: Vec<String> = content.split_inclusive('\n').map(|l| l.to_string()).collect();

    let mut ordered: Vec<&LineEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.line.cmp(&a.line).then(b.start.cmp(&a.start)));

    for edit in ordered {
        let line = match edit.line.checked_sub(1).and_then(|i| lines.get_mut(i)) {
            Some(line) => line,
            None => continue,
        };
        let body_len = line.trim_end_matches(['\n', '\r']).len();
        if edit.start > edit.end
            || edit.end > body_len
            || !line.is_char_boundary(edit.start)
            || !line.is_char_boundary(edit.end)
        {
            tracing::warn!(line = edit.line, "Skipping out-of-range link edit");
            continue;
        }
        line.replace_range(edit.start..edit.end, &edit.replacement);
    }

    lines.concat()
}
