//! In-memory document index.
//!
//! [`VaultIndex`] walks the vault once, parses every eligible document
//! (frontmatter, tags, links) and answers [`DocumentIndex`] calls from memory.
//! It does not watch the disk; call [`VaultIndex::refresh`] after mutations.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use walkdir::WalkDir;

use crate::config::RelocationConfig;
use crate::links::{extract_links, Link, LinkKind};
use crate::markdown::{extract_tags, parse_frontmatter, split_frontmatter};
use crate::models::{Document, FileStat};
use crate::ports::{DocumentIndex, IndexError, QueryCondition, QueryMatcher};
use crate::utils::{normalize, slash_basename, strip_extension, vault_relative};

/// A parsed document plus the links needed to compute backlinks
struct IndexedDocument {
    document: Document,
    links: Vec<Link>,
}

/// [`DocumentIndex`] built by scanning the vault with `walkdir`
pub struct VaultIndex {
    vault_root: PathBuf,
    config: RelocationConfig,
    documents: RwLock<BTreeMap<PathBuf, Document>>,
}

impl VaultIndex {
    /// Empty index; nothing is scanned until [`refresh`](Self::refresh)
    pub fn new(vault_root: impl Into<PathBuf>, config: RelocationConfig) -> Self {
        Self {
            vault_root: normalize(&vault_root.into()),
            config,
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Scan the vault and return a ready index
    pub async fn build(
        vault_root: impl Into<PathBuf>,
        config: RelocationConfig,
    ) -> Result<Self, IndexError> {
        let index = Self::new(vault_root, config);
        index.refresh().await?;
        Ok(index)
    }

    /// Rescan the vault, replacing everything held in memory
    pub async fn refresh(&self) -> Result<usize, IndexError> {
        let root = self.vault_root.clone();
        let config = self.config.clone();
        let scanned = tokio::task::spawn_blocking(move || scan_vault(&root, &config))
            .await
            .map_err(|e| IndexError::Unavailable(format!("Scan task failed: {}", e)))?;

        let count = scanned.len();
        let mut documents = self
            .documents
            .write()
            .map_err(|_| IndexError::Unavailable("Index lock poisoned".to_string()))?;
        *documents = scanned;

        tracing::info!(root = %self.vault_root.display(), documents = count, "Indexed vault");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<PathBuf, Document>>, IndexError> {
        self.documents
            .read()
            .map_err(|_| IndexError::Unavailable("Index lock poisoned".to_string()))
    }

    fn matches(&self, document: &Document, condition: &QueryCondition) -> bool {
        let field = condition.field.as_str();
        match field {
            "name" => condition.matcher.matches_str(&document.metadata.name),
            "path" => vault_relative(&self.vault_root, &document.path)
                .map(|rel| condition.matcher.matches_str(&rel))
                .unwrap_or(false),
            "folder" => {
                let folder =
                    vault_relative(&self.vault_root, document.parent_dir()).unwrap_or_default();
                condition.matcher.matches_str(&folder)
            }
            "extension" => document
                .path
                .extension()
                .map(|e| condition.matcher.matches_str(&e.to_string_lossy()))
                .unwrap_or(false),
            "tag" | "tags" => {
                let matcher = strip_hash(&condition.matcher);
                document
                    .metadata
                    .tags
                    .iter()
                    .any(|tag| matcher.matches_str(tag))
            }
            key => document
                .metadata
                .frontmatter
                .get(key)
                .map(|value| condition.matcher.matches_value(value))
                .unwrap_or(false),
        }
    }
}

/// `#project` and `project` name the same tag
fn strip_hash(matcher: &QueryMatcher) -> QueryMatcher {
    match matcher {
        QueryMatcher::Exact(Value::String(s)) => {
            QueryMatcher::Exact(Value::String(s.trim_start_matches('#').to_string()))
        }
        QueryMatcher::Pattern(p) => QueryMatcher::Pattern(p.trim_start_matches('#').to_string()),
        other => other.clone(),
    }
}

#[async_trait]
impl DocumentIndex for VaultIndex {
    async fn query(&self, conditions: &[QueryCondition]) -> Result<Vec<Document>, IndexError> {
        let documents = self.read()?;
        Ok(documents
            .values()
            .filter(|doc| conditions.iter().all(|c| self.matches(doc, c)))
            .cloned()
            .collect())
    }

    async fn get_all_documents(&self) -> Result<Vec<Document>, IndexError> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn get_document(&self, path: &Path) -> Result<Option<Document>, IndexError> {
        Ok(self.read()?.get(&normalize(path)).cloned())
    }

    async fn get_outgoing_links(&self, path: &Path) -> Result<Vec<String>, IndexError> {
        Ok(self
            .read()?
            .get(&normalize(path))
            .map(|doc| doc.metadata.outgoing_links.clone())
            .unwrap_or_default())
    }

    async fn get_backlinks(&self, path: &Path) -> Result<Vec<String>, IndexError> {
        Ok(self
            .read()?
            .get(&normalize(path))
            .map(|doc| doc.metadata.backlinks.clone())
            .unwrap_or_default())
    }
}

/// Walk the vault and parse every eligible document
fn scan_vault(root: &Path, config: &RelocationConfig) -> BTreeMap<PathBuf, Document> {
    let mut indexed: BTreeMap<PathBuf, IndexedDocument> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            vault_relative(root, entry.path())
                .map(|rel| rel.is_empty() || !config.excludes(&rel))
                .unwrap_or(false)
        })
        .filter_map(|e| e.ok());

    for entry in walker {
        if !entry.file_type().is_file() {
            continue;
        }
        let eligible = entry
            .path()
            .extension()
            .map(|ext| config.accepts_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if !eligible {
            continue;
        }

        let path = normalize(entry.path());
        match parse_document(&path) {
            Ok(doc) => {
                indexed.insert(path, doc);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
            }
        }
    }

    link_backlinks(root, indexed)
}

fn parse_document(path: &Path) -> std::io::Result<IndexedDocument> {
    let metadata = std::fs::metadata(path)?;
    let content = std::fs::read_to_string(path)?;

    let frontmatter = parse_frontmatter(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid frontmatter");
        Default::default()
    });
    let body = split_frontmatter(&content).body;
    let links = extract_links(&content);

    let mut document = Document::from_stat(path, &FileStat::from_metadata(&metadata));
    document.metadata.tags = extract_tags(&frontmatter, body);
    document.metadata.frontmatter = frontmatter;
    document.metadata.outgoing_links = links.iter().map(|l| l.target.clone()).collect();

    Ok(IndexedDocument { document, links })
}

/// Resolve every link and record the source on its target's backlinks
fn link_backlinks(
    root: &Path,
    indexed: BTreeMap<PathBuf, IndexedDocument>,
) -> BTreeMap<PathBuf, Document> {
    let resolver = LinkResolver::new(root, indexed.keys());
    let mut backlinks: HashMap<PathBuf, Vec<String>> = HashMap::new();

    for (source, doc) in &indexed {
        let source_dir = source.parent().unwrap_or(root);
        for link in &doc.links {
            if link.is_external() {
                continue;
            }
            if let Some(target) = resolver.resolve(link, source_dir) {
                if target == *source {
                    continue;
                }
                let entry = backlinks.entry(target).or_default();
                let source = source.display().to_string();
                if !entry.contains(&source) {
                    entry.push(source);
                }
            }
        }
    }

    indexed
        .into_iter()
        .map(|(path, mut doc)| {
            if let Some(sources) = backlinks.remove(&path) {
                doc.document.metadata.backlinks = sources;
            }
            (path, doc.document)
        })
        .collect()
}

/// Maps link targets back to indexed paths
struct LinkResolver<'a> {
    root: &'a Path,
    /// Vault-relative path without extension -> path
    by_rel: HashMap<String, PathBuf>,
    /// Basename without extension -> first path in sorted order.
    ///
    /// Matching is case-sensitive, the same rule the relocation engine uses.
    by_name: HashMap<String, PathBuf>,
}

impl<'a> LinkResolver<'a> {
    fn new<'p>(root: &'a Path, paths: impl Iterator<Item = &'p PathBuf>) -> Self {
        let mut by_rel = HashMap::new();
        let mut by_name = HashMap::new();
        for path in paths {
            let rel = match vault_relative(root, path) {
                Some(rel) => rel,
                None => continue,
            };
            let key = strip_extension(&rel).to_string();
            by_name
                .entry(slash_basename(&key).to_string())
                .or_insert_with(|| path.clone());
            by_rel.insert(key, path.clone());
        }
        Self {
            root,
            by_rel,
            by_name,
        }
    }

    fn resolve(&self, link: &Link, source_dir: &Path) -> Option<PathBuf> {
        let target = match link.kind {
            LinkKind::MarkdownLink => urlencoding::decode(&link.target)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| link.target.clone()),
            LinkKind::Wikilink => link.target.trim().to_string(),
        }
        .replace('\\', "/");

        let location_based = link.kind == LinkKind::MarkdownLink
            || target.starts_with("./")
            || target.starts_with("../");

        if location_based {
            let absolute = match target.strip_prefix('/') {
                Some(rooted) => normalize(&self.root.join(rooted)),
                None => normalize(&source_dir.join(&target)),
            };
            let rel = vault_relative(self.root, &absolute)?;
            return self.by_rel.get(strip_extension(&rel)).cloned();
        }

        let key = strip_extension(target.trim_start_matches('/')).to_string();
        if let Some(path) = self.by_rel.get(&key) {
            return Some(path.clone());
        }
        if !key.contains('/') {
            return self.by_name.get(&key).cloned();
        }
        let suffix = format!("/{}", key);
        self.by_rel
            .iter()
            .filter(|(rel, _)| rel.ends_with(&suffix))
            .map(|(_, path)| path)
            .min()
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    async fn sample_index() -> (tempfile::TempDir, VaultIndex) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "Projects/project1.md",
            "---\nstatus: active\ntags: [work]\n---\nSee [[Tasks/task1]] and [[task2]]. #planning\n",
        );
        write(root, "Tasks/task1.md", "---\nstatus: draft\n---\n[back](../Projects/project1.md)\n");
        write(root, "Tasks/task2.md", "No links here\n");
        write(root, ".obsidian/workspace.md", "[[task1]]\n");
        write(root, "Tasks/readme.txt", "[[task1]]\n");

        let index = VaultIndex::build(root, RelocationConfig::default())
            .await
            .unwrap();
        (dir, index)
    }

    #[tokio::test]
    async fn test_build_skips_excluded_and_foreign_files() {
        let (_dir, index) = sample_index().await;
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_metadata_and_links() {
        let (dir, index) = sample_index().await;
        let project = dir.path().join("Projects/project1.md");

        let doc = index.get_document(&project).await.unwrap().unwrap();
        assert_eq!(doc.metadata.name, "project1");
        assert_eq!(doc.metadata.frontmatter["status"], json!("active"));
        assert_eq!(doc.metadata.tags, vec!["work", "planning"]);
        assert!(doc.content.is_empty());

        let outgoing = index.get_outgoing_links(&project).await.unwrap();
        assert_eq!(outgoing, vec!["Tasks/task1", "task2"]);

        let backlinks = index
            .get_backlinks(&dir.path().join("Tasks/task1.md"))
            .await
            .unwrap();
        assert_eq!(backlinks, vec![project.display().to_string()]);

        let backlinks = index.get_backlinks(&project).await.unwrap();
        assert_eq!(
            backlinks,
            vec![dir.path().join("Tasks/task1.md").display().to_string()]
        );
    }

    #[tokio::test]
    async fn test_query_conditions() {
        let (_dir, index) = sample_index().await;

        let drafts = index
            .query(&[QueryCondition::from_criterion("status", &json!("draft"))])
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].metadata.name, "task1");

        let tasks = index
            .query(&[QueryCondition::from_criterion("path", &json!("Tasks/*"))])
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);

        let tagged = index
            .query(&[
                QueryCondition::from_criterion("tag", &json!("#Planning")),
                QueryCondition::from_criterion("folder", &json!("projects")),
            ])
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);

        let none = index
            .query(&[QueryCondition::from_criterion("missing", &json!("x"))])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_backlinks_follow_relocation_case_rule() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "Tasks/task1.md", "x\n");
        write(root, "exact.md", "[[task1]]\n");
        write(root, "shouted.md", "[[Task1]] and [[TASKS/task1]]\n");
        let index = VaultIndex::build(root, RelocationConfig::default())
            .await
            .unwrap();

        let target = root.join("Tasks/task1.md");
        let backlinks = index.get_backlinks(&target).await.unwrap();
        assert_eq!(backlinks, vec![root.join("exact.md").display().to_string()]);

        let relocator = crate::links::LinkRelocator::new(
            root.to_path_buf(),
            std::sync::Arc::new(crate::storage::LocalVaultFs::new()),
            RelocationConfig::default(),
        );
        let referencing: Vec<PathBuf> = relocator
            .find_references(&target)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_path)
            .collect();
        assert_eq!(referencing, vec![root.join("exact.md")]);
    }

    #[tokio::test]
    async fn test_unknown_path_has_no_links() {
        let (dir, index) = sample_index().await;
        let missing = dir.path().join("nope.md");
        assert!(index.get_document(&missing).await.unwrap().is_none());
        assert!(index.get_outgoing_links(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_files() {
        let (dir, index) = sample_index().await;
        write(dir.path(), "Inbox/new.md", "fresh\n");
        assert_eq!(index.refresh().await.unwrap(), 4);
    }
}
