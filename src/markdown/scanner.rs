//! Line classification for markdown text.
//!
//! A document is scanned top to bottom through a two-state machine: outside
//! or inside a fenced code block. Only lines classified as
//! [`LineClass::Scannable`] may yield links or tags.

use std::ops::Range;

/// Marker that opened a fenced code block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceMarker {
    Backticks,
    Tildes,
}

/// Scanner state between lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Ordinary markdown
    Text,
    /// Inside a fenced code block opened with the given marker
    Fenced(FenceMarker),
}

/// What a single line means for link and tag extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Ordinary text; scan it
    Scannable,
    /// A fence delimiter line (opening or closing)
    Fence,
    /// Inside a fenced code block
    InsideFence,
    /// Carries a complete single-line comment (`<!-- -->` or `%% %%`)
    Comment,
}

impl LineClass {
    pub fn is_scannable(self) -> bool {
        self == LineClass::Scannable
    }
}

/// Two-state line scanner
#[derive(Debug, Clone)]
pub struct LineScanner {
    state: ScanState,
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LineScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Text,
        }
    }

    /// Current state, after the last classified line
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Classify the next line and advance the state machine
    pub fn classify(&mut self, line: &str) -> LineClass {
        let marker = fence_marker(line.trim());

        match (self.state, marker) {
            (ScanState::Text, Some(opened)) => {
                self.state = ScanState::Fenced(opened);
                LineClass::Fence
            }
            (ScanState::Fenced(open), Some(closing)) if open == closing => {
                self.state = ScanState::Text;
                LineClass::Fence
            }
            (ScanState::Fenced(_), _) => LineClass::InsideFence,
            (ScanState::Text, None) if has_single_line_comment(line) => LineClass::Comment,
            (ScanState::Text, None) => LineClass::Scannable,
        }
    }
}

fn fence_marker(trimmed: &str) -> Option<FenceMarker> {
    if trimmed.starts_with("```") {
        Some(FenceMarker::Backticks)
    } else if trimmed.starts_with("~~~") {
        Some(FenceMarker::Tildes)
    } else {
        None
    }
}

/// Whether the line holds a comment that opens and closes on the same line
pub fn has_single_line_comment(line: &str) -> bool {
    if let Some(open) = line.find("<!--") {
        if line[open + 4..].contains("-->") {
            return true;
        }
    }
    if let Some(open) = line.find("%%") {
        if line[open + 2..].contains("%%") {
            return true;
        }
    }
    false
}

/// Byte ranges of inline code spans (`` `code` ``, ``` ``co`de`` ```) in a line
pub fn inline_code_ranges(line: &str) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - start;

        // Look for a closing run of the same length
        let mut j = i;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let close_start = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - close_start == run {
                    closed = Some(j);
                    break;
                }
            } else {
                j += 1;
            }
        }

        match closed {
            Some(end) => {
                ranges.push(start..end);
                i = end;
            }
            None => break,
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_all(text: &str) -> Vec<LineClass> {
        let mut scanner = LineScanner::new();
        text.lines().map(|l| scanner.classify(l)).collect()
    }

    #[test]
    fn test_fenced_block_toggles() {
        let classes = classify_all("a\n```rust\n[[x]]\n```\nb");
        assert_eq!(
            classes,
            vec![
                LineClass::Scannable,
                LineClass::Fence,
                LineClass::InsideFence,
                LineClass::Fence,
                LineClass::Scannable,
            ]
        );
    }

    #[test]
    fn test_fence_closed_only_by_same_marker() {
        let classes = classify_all("~~~\n```\n[[x]]\n~~~\ntext");
        assert_eq!(classes[1], LineClass::InsideFence);
        assert_eq!(classes[2], LineClass::InsideFence);
        assert_eq!(classes[3], LineClass::Fence);
        assert_eq!(classes[4], LineClass::Scannable);
    }

    #[test]
    fn test_indented_fence() {
        let mut scanner = LineScanner::new();
        assert_eq!(scanner.classify("   ```"), LineClass::Fence);
        assert!(matches!(scanner.state(), ScanState::Fenced(_)));
    }

    #[test]
    fn test_single_line_comments() {
        assert!(has_single_line_comment("see <!-- [[old]] --> here"));
        assert!(has_single_line_comment("%% [[hidden]] %%"));
        assert!(!has_single_line_comment("<!-- opens only"));
        assert!(!has_single_line_comment("100% sure"));

        let classes = classify_all("<!-- [[a]] -->\n[[a]]");
        assert_eq!(classes, vec![LineClass::Comment, LineClass::Scannable]);
    }

    #[test]
    fn test_inline_code_ranges() {
        let line = "a `[[x]]` b ``c`d`` e `open";
        let ranges = inline_code_ranges(line);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&line[ranges[0].clone()], "`[[x]]`");
        assert_eq!(&line[ranges[1].clone()], "``c`d``");
    }
}
