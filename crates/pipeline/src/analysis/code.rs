//! Code block detection: closed fences and indented blocks.

use super::{lists, overlaps_any, Line};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

static FENCE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ ]{0,3}(`{3,}|~{3,})[ \t]*([A-Za-z0-9_+#.\-]*)[^`\n]*$")
        .expect("valid code fence regex")
});

const INDENT: usize = 4;

const MAX_FENCE_INDENT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSpan {
    pub range: Range<usize>,
    pub language: Option<String>,
    pub fenced: bool,
    /// Block body without fences or indentation
    pub content: String,
    pub page_number: u32,
}

pub(crate) fn detect(lines: &[Line<'_>], page_number: u32) -> Vec<CodeSpan> {
    let mut blocks = detect_fenced(lines, page_number);
    let fenced: Vec<Range<usize>> = blocks.iter().map(|b| b.range.clone()).collect();
    blocks.extend(detect_indented(lines, &fenced, page_number));
    blocks.sort_by_key(|b| b.range.start);
    blocks
}

fn detect_fenced(lines: &[Line<'_>], page_number: u32) -> Vec<CodeSpan> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = FENCE_OPEN.captures(lines[i].text) else {
            i += 1;
            continue;
        };
        let fence = caps[1].to_string();
        let language = Some(caps[2].to_string()).filter(|l| !l.is_empty());
        let marker = fence.chars().next().unwrap_or('`');

        let close = (i + 1..lines.len()).find(|&j| is_closing_fence(lines[j].text, marker, fence.len()));

        match close {
            Some(j) => {
                let content = lines[i + 1..j]
                    .iter()
                    .map(|l| l.text)
                    .collect::<Vec<_>>()
                    .join("\n");
                blocks.push(CodeSpan {
                    range: lines[i].start..lines[j].end,
                    language,
                    fenced: true,
                    content,
                    page_number,
                });
                i = j + 1;
            }
            // An unclosed fence is not a block.
            None => i += 1,
        }
    }

    blocks
}

/// Same leading indent rule as [`FENCE_OPEN`]: up to three plain spaces.
fn is_closing_fence(line: &str, marker: char, min_len: usize) -> bool {
    let body = line.trim_start_matches(' ');
    if line.len() - body.len() > MAX_FENCE_INDENT {
        return false;
    }
    let body = body.trim_end_matches([' ', '\t']);
    body.chars().count() >= min_len && body.chars().all(|c| c == marker)
}

fn detect_indented(lines: &[Line<'_>], fenced: &[Range<usize>], page_number: u32) -> Vec<CodeSpan> {
    let is_code_line = |l: &Line<'_>| {
        !l.is_blank()
            && l.indent() >= INDENT
            && !overlaps_any(&(l.start..l.end), fenced)
    };

    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let opens_block = is_code_line(&lines[i])
            && (i == 0 || lines[i - 1].is_blank())
            && !lists::is_list_item(lines[i].text)
            && !follows_list(lines, i);
        if !opens_block {
            i += 1;
            continue;
        }

        let mut last = i;
        let mut j = i + 1;
        while j < lines.len() {
            if is_code_line(&lines[j]) {
                last = j;
            } else if !lines[j].is_blank() {
                break;
            }
            j += 1;
        }

        let body = &lines[i..=last];
        if body.iter().filter(|l| !l.is_blank()).count() >= 2 {
            let content = body
                .iter()
                .map(|l| strip_indent(l.text))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(CodeSpan {
                range: lines[i].start..lines[last].end,
                language: None,
                fenced: false,
                content,
                page_number,
            });
        }
        i = last + 1;
    }

    blocks
}

/// Indented lines right after a list are nested items or wrapped text.
fn follows_list(lines: &[Line<'_>], idx: usize) -> bool {
    lines[..idx]
        .iter()
        .rev()
        .find(|l| !l.is_blank())
        .is_some_and(|l| lists::is_list_item(l.text))
}

fn strip_indent(line: &str) -> &str {
    let mut width = 0;
    for (pos, c) in line.char_indices() {
        if width >= INDENT {
            return &line[pos..];
        }
        match c {
            ' ' => width += 1,
            '\t' => width += INDENT,
            _ => return &line[pos..],
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::split_lines;

    #[test]
    fn test_fenced_block_with_language() {
        let text = "Intro\n```rust\nfn main() {}\n```\nOutro";
        let blocks = detect(&split_lines(text), 1);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].fenced);
        assert_eq!(blocks[0].language.as_deref(), Some("rust"));
        assert_eq!(blocks[0].content, "fn main() {}");
        assert_eq!(&text[blocks[0].range.clone()], "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_unclosed_fence_is_ignored() {
        let blocks = detect(&split_lines("```\nlet a = 1;\nno end"), 1);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_indented_block_spans_blank_lines() {
        let text = "Run this:\n\n    make build\n\n    make install\n\nDone.";
        let blocks = detect(&split_lines(text), 1);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].fenced);
        assert_eq!(blocks[0].content, "make build\n\nmake install");
    }

    #[test]
    fn test_closing_fence_follows_opening_indent_rule() {
        // A non-breaking space or deep indent does not close a fence
        let blocks = detect(&split_lines("```\nx\n\u{a0}```\n    ```\n  ```"), 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "x\n\u{a0}```\n    ```");

        let blocks = detect(&split_lines("```\nx\n   ```\t"), 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "x");
    }

    #[test]
    fn test_nested_list_is_not_code() {
        let text = "- parent\n\n    - child one\n    - child two\n";
        assert!(detect(&split_lines(text), 1).is_empty());
    }
}
