//! List detection: bullets, numbered/lettered/roman items, steps and definitions.

use super::{overlaps_any, Line};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Numbered,
    Definition,
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub marker: String,
    pub text: String,
    /// Nesting depth, one level per two columns of indentation
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSpan {
    pub range: Range<usize>,
    pub kind: ListKind,
    pub items: Vec<ListItem>,
    pub page_number: u32,
}

static ITEM_PATTERNS: LazyLock<Vec<(ListKind, Regex)>> = LazyLock::new(|| {
    [
        (ListKind::Numbered, r"^(\s*)((?i:step)\s+\d+[:.)]?)\s+(\S.*)$"),
        (ListKind::Numbered, r"^(\s*)(\d+(?:\.\d+)*[.)])\s+(\S.*)$"),
        (ListKind::Numbered, r"^(\s*)(\(\d+\)|\([a-z]\))\s+(\S.*)$"),
        (ListKind::Numbered, r"^(\s*)((?:[ivx]{1,5}|[IVX]{1,5})[.)])\s+(\S.*)$"),
        (ListKind::Numbered, r"^(\s*)([A-Za-z][.)])\s+(\S.*)$"),
        (ListKind::Bullet, r"^(\s*)([•◦▪▫‣⁃●○■□➢➤►▸✓✔]|[-*+])\s+(\S.*)$"),
        (ListKind::Definition, r"^(\s*)([A-Za-z][\w \-]{0,40}?):\s+(\S.*)$"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid list item regex")))
    .collect()
});

struct ParsedItem {
    kind: ListKind,
    indent: usize,
    item: ListItem,
}

fn parse_item(line: &str) -> Option<ParsedItem> {
    ITEM_PATTERNS.iter().find_map(|(kind, re)| {
        re.captures(line).map(|caps| {
            let indent = super::indent_width(&caps[1]);
            ParsedItem {
                kind: *kind,
                indent,
                item: ListItem {
                    marker: caps[2].trim().to_string(),
                    text: caps[3].trim().to_string(),
                    level: indent / 2,
                },
            }
        })
    })
}

/// Whether a line starts a list item of any kind.
pub fn is_list_item(line: &str) -> bool {
    parse_item(line).is_some()
}

pub(crate) fn detect(lines: &[Line<'_>], claimed: &[Range<usize>], page_number: u32) -> Vec<ListSpan> {
    let free = |idx: usize| !overlaps_any(&(lines[idx].start..lines[idx].end.max(lines[idx].start + 1)), claimed);
    let item_at = |idx: usize| if free(idx) { parse_item(lines[idx].text) } else { None };

    let mut lists = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(first) = item_at(i) else {
            i += 1;
            continue;
        };

        let kind = first.kind;
        let mut last_indent = first.indent;
        let mut items = vec![first.item];
        let mut last_line = i;
        let mut j = i + 1;

        while j < lines.len() {
            if !free(j) {
                break;
            }
            if let Some(next) = parse_item(lines[j].text) {
                last_indent = next.indent;
                items.push(next.item);
                last_line = j;
                j += 1;
                continue;
            }
            if lines[j].is_blank() {
                let resume = (j + 1..lines.len()).find(|k| !lines[*k].is_blank());
                match resume {
                    Some(k) if item_at(k).is_some() => {
                        j = k;
                        continue;
                    }
                    _ => break,
                }
            }
            // Wrapped item text, indented past its marker.
            if j == last_line + 1 && lines[j].indent() > last_indent {
                if let Some(item) = items.last_mut() {
                    item.text.push(' ');
                    item.text.push_str(lines[j].text.trim());
                }
                last_line = j;
                j += 1;
                continue;
            }
            break;
        }

        if items.len() >= 2 {
            lists.push(ListSpan {
                range: lines[i].start..lines[last_line].end,
                kind,
                items,
                page_number,
            });
            i = last_line + 1;
        } else {
            i += 1;
        }
    }

    lists
}
