use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::scanner::{inline_code_ranges, LineScanner};

static INLINE_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#([\p{L}\p{N}_/\-]+)").unwrap());

/// Normalize a tag for comparison: no leading `#`, lowercase
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// Collect tags from the `tags`/`tag` frontmatter keys and inline `#tags`.
///
/// Order of first appearance is kept; duplicates (case-insensitive) dropped.
pub fn extract_tags(frontmatter: &Map<String, Value>, body: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let tag = raw.trim().trim_start_matches('#').to_string();
        if tag.is_empty() {
            return;
        }
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    };

    for key in ["tags", "tag"] {
        match frontmatter.get(key) {
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(s) = item {
                        push(s);
                    }
                }
            }
            Some(Value::String(s)) => {
                for part in s.split(|c: char| c == ',' || c.is_whitespace()) {
                    push(part);
                }
            }
            _ => {}
        }
    }

    let mut scanner = LineScanner::new();
    for line in body.lines() {
        if !scanner.classify(line).is_scannable() {
            continue;
        }
        let code = inline_code_ranges(line);
        for cap in INLINE_TAG_REGEX.captures_iter(line) {
            let m = match cap.get(1) {
                Some(m) => m,
                None => continue,
            };
            if code.iter().any(|r| r.contains(&m.start())) {
                continue;
            }
            // Obsidian does not treat purely numeric words as tags
            if m.as_str().chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            push(m.as_str());
        }
    }

    tags
}
