//! Link extraction.
//!
//! Every link records the byte range of its *target* inside its line, so a
//! rewrite replaces exactly that span and leaves anchors, display text,
//! titles and embed markers untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::markdown::{inline_code_ranges, LineScanner};

/// `[[target#anchor|display]]`, optionally prefixed with `!` for embeds
static WIKILINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!)?\[\[([^\[\]|#]*)(#[^\[\]|]*)?(?:\|([^\[\]]*))?\]\]").unwrap()
});

/// `[text](dest "title")` or `[text](<dest with spaces>)`, optionally an image
static MARKDOWN_LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(!)?\[([^\[\]]*)\]\((?:<([^<>]+)>|([^()\s]+))(?:\s+"([^"]*)")?\)"#).unwrap()
});

static URL_SCHEME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").unwrap());

/// Link syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    Wikilink,
    MarkdownLink,
}

/// A link found in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub kind: LinkKind,
    /// Full matched text, e.g. `[[task1#impl|Impl]]`
    pub raw: String,
    /// Path part without anchor, exactly as written
    pub target: String,
    /// 1-based line number
    pub line: usize,
    /// Byte offset of the target within its line
    pub target_start: usize,
    /// Byte offset one past the target within its line
    pub target_end: usize,
    pub display_text: Option<String>,
    /// Anchor without the leading `#`
    pub anchor: Option<String>,
    /// `![[...]]` or `![...](...)`
    pub embed: bool,
}

impl Link {
    /// URLs with a scheme (`https:`, `mailto:`, `obsidian:`) never point into the vault
    pub fn is_external(&self) -> bool {
        self.kind == LinkKind::MarkdownLink && URL_SCHEME_REGEX.is_match(&self.target)
    }
}

/// Extract every link from `content`, skipping fenced code, one-line comments
/// and inline code spans.
pub fn extract_links(content: &str) -> Vec<Link> {
    let mut scanner = LineScanner::new();
    let mut links = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if !scanner.classify(line).is_scannable() {
            continue;
        }
        links.extend(extract_line_links(line, idx + 1));
    }

    links
}

/// Extract the links of a single scannable line
pub fn extract_line_links(line: &str, line_number: usize) -> Vec<Link> {
    let code = inline_code_ranges(line);
    let in_code = |pos: usize| code.iter().any(|r| r.contains(&pos));

    let mut links = Vec::new();
    let mut wiki_spans = Vec::new();

    for cap in WIKILINK_REGEX.captures_iter(line) {
        let whole = match cap.get(0) {
            Some(m) => m,
            None => continue,
        };
        wiki_spans.push(whole.range());
        if in_code(whole.start()) {
            continue;
        }
        let target = match cap.get(2) {
            Some(t) if !t.as_str().trim().is_empty() => t,
            // `[[#heading]]` points into the same file
            _ => continue,
        };

        links.push(Link {
            kind: LinkKind::Wikilink,
            raw: whole.as_str().to_string(),
            target: target.as_str().to_string(),
            line: line_number,
            target_start: target.start(),
            target_end: target.end(),
            display_text: cap.get(4).map(|m| m.as_str().to_string()),
            anchor: cap.get(3).map(|m| m.as_str()[1..].to_string()),
            embed: cap.get(1).is_some(),
        });
    }

    for cap in MARKDOWN_LINK_REGEX.captures_iter(line) {
        let whole = match cap.get(0) {
            Some(m) => m,
            None => continue,
        };
        if in_code(whole.start()) || wiki_spans.iter().any(|s| s.contains(&whole.start())) {
            continue;
        }
        let dest = match cap.get(3).or_else(|| cap.get(4)) {
            Some(d) => d,
            None => continue,
        };

        let (path, anchor) = match dest.as_str().find('#') {
            Some(i) => (&dest.as_str()[..i], Some(dest.as_str()[i + 1..].to_string())),
            None => (dest.as_str(), None),
        };
        if path.is_empty() {
            continue;
        }

        links.push(Link {
            kind: LinkKind::MarkdownLink,
            raw: whole.as_str().to_string(),
            target: path.to_string(),
            line: line_number,
            target_start: dest.start(),
            target_end: dest.start() + path.len(),
            display_text: cap.get(2).map(|m| m.as_str().to_string()),
            anchor,
            embed: cap.get(1).is_some(),
        });
    }

    links.sort_by_key(|l| l.target_start);
    links
}
