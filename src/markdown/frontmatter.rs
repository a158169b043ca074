//! YAML frontmatter handling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading or writing frontmatter
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "details")]
pub enum FrontmatterError {
    /// The YAML block does not parse
    #[error("Invalid frontmatter YAML: {0}")]
    InvalidYaml(String),

    /// The YAML block parses but is not a key/value mapping
    #[error("Frontmatter is not a mapping")]
    NotAMapping,

    /// Serializing the updated mapping failed
    #[error("Failed to render frontmatter: {0}")]
    Render(String),
}

/// A document split into its frontmatter block and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    /// Raw YAML between the delimiters, if the document has a block
    pub yaml: Option<&'a str>,
    /// Everything after the closing delimiter line
    pub body: &'a str,
}

/// Split `content` into frontmatter and body.
///
/// The block must start on the very first line with `---` and close with a
/// line holding only `---` or `...`.
pub fn split_frontmatter(content: &str) -> SplitDocument<'_> {
    let no_block = SplitDocument {
        yaml: None,
        body: content,
    };

    let first_end = match content.find('\n') {
        Some(i) => i,
        None => return no_block,
    };
    if content[..first_end].trim_end() != "---" {
        return no_block;
    }

    let yaml_start = first_end + 1;
    let mut offset = yaml_start;
    for line in content[yaml_start..].split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return SplitDocument {
                yaml: Some(&content[yaml_start..offset]),
                body: &content[offset + line.len()..],
            };
        }
        offset += line.len();
    }

    no_block
}

/// Parse the frontmatter of `content` into a JSON-compatible map.
///
/// A document without a block, or with an empty block, yields an empty map.
pub fn parse_frontmatter(content: &str) -> Result<Map<String, Value>, FrontmatterError> {
    let yaml = match split_frontmatter(content).yaml {
        Some(yaml) if !yaml.trim().is_empty() => yaml,
        _ => return Ok(Map::new()),
    };

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

/// Render `frontmatter` in front of `body`.
///
/// An empty map drops the block entirely.
pub fn render_document(
    frontmatter: &Map<String, Value>,
    body: &str,
) -> Result<String, FrontmatterError> {
    if frontmatter.is_empty() {
        return Ok(body.to_string());
    }

    let yaml =
        serde_yaml::to_string(frontmatter).map_err(|e| FrontmatterError::Render(e.to_string()))?;

    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str("---\n");
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_frontmatter() {
        let doc = "---\nstatus: draft\n---\n# Body\n";
        let split = split_frontmatter(doc);
        assert_eq!(split.yaml, Some("status: draft\n"));
        assert_eq!(split.body, "# Body\n");
    }

    #[test]
    fn test_split_without_block() {
        let doc = "# Just a note\n---\nnot: frontmatter\n";
        let split = split_frontmatter(doc);
        assert_eq!(split.yaml, None);
        assert_eq!(split.body, doc);

        let unclosed = "---\nstatus: draft\n";
        assert_eq!(split_frontmatter(unclosed).yaml, None);
    }

    #[test]
    fn test_parse_frontmatter() {
        let doc = "---\nstatus: draft\ntags: [a, b]\npriority: 2\n---\nbody";
        let fm = parse_frontmatter(doc).unwrap();
        assert_eq!(fm["status"], json!("draft"));
        assert_eq!(fm["tags"], json!(["a", "b"]));
        assert_eq!(fm["priority"], json!(2));

        assert!(parse_frontmatter("no block").unwrap().is_empty());
        assert!(parse_frontmatter("---\n---\nbody").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_scalar_and_garbage() {
        assert!(matches!(
            parse_frontmatter("---\njust a string\n---\n"),
            Err(FrontmatterError::NotAMapping)
        ));
        assert!(matches!(
            parse_frontmatter("---\nkey: [unclosed\n---\n"),
            Err(FrontmatterError::InvalidYaml(_))
        ));
    }

    #[test]
    fn test_render_document() {
        let mut fm = Map::new();
        fm.insert("status".to_string(), json!("done"));
        let out = render_document(&fm, "# Body\n").unwrap();
        assert_eq!(out, "---\nstatus: done\n---\n# Body\n");

        let reparsed = parse_frontmatter(&out).unwrap();
        assert_eq!(reparsed["status"], json!("done"));

        assert_eq!(render_document(&Map::new(), "body").unwrap(), "body");
    }
}
