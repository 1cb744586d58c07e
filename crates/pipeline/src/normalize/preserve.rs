//! Placeholder protection for structured spans during normalization.

use crate::analysis::{code, diagrams, split_lines, tables, technical, Line, TechnicalKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreservedKind {
    Table,
    Code,
    Formula,
    Diagram,
}

/// A span kept verbatim through normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreservedSpan {
    pub kind: PreservedKind,
    pub text: String,
}

/// Text with structured spans swapped for placeholders.
#[derive(Debug, Clone)]
pub(crate) struct Masked {
    pub text: String,
    pub preserved: Vec<PreservedSpan>,
    /// Wraps each placeholder index. Never present in the input.
    sentinel: char,
}

impl Masked {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            preserved: Vec::new(),
            sentinel: '\u{E000}',
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("{0}{index}{0}", self.sentinel)
    }

    /// Put preserved spans back in place of their placeholders in `text`.
    pub fn restore(&self, text: &str) -> String {
        if self.preserved.is_empty() {
            return text.to_string();
        }

        let sentinel = self.sentinel;
        let width = sentinel.len_utf8();
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(sentinel) {
            out.push_str(&rest[..open]);
            let after = &rest[open + width..];
            let span = after.find(sentinel).and_then(|close| {
                after[..close]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.preserved.get(index))
                    .map(|span| (span, close))
            });
            match span {
                Some((span, close)) => {
                    out.push_str(&span.text);
                    rest = &after[close + width..];
                }
                None => {
                    out.push(sentinel);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_private_use(c: char) -> bool {
    matches!(c, '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}')
}

/// First private-use character the text does not already contain. Symbol
/// fonts extract into this range, so a fixed choice could collide.
fn pick_sentinel(text: &str) -> Option<char> {
    let used: HashSet<char> = text.chars().filter(|c| is_private_use(*c)).collect();
    ('\u{E000}'..='\u{F8FF}')
        .chain('\u{F0000}'..='\u{FFFFD}')
        .find(|c| !used.contains(c))
}

/// Replace whole-line structured spans with placeholders.
pub(crate) fn extract(text: &str) -> Masked {
    let lines = split_lines(text);
    let spans = protected_spans(text, &lines);
    if spans.is_empty() {
        return Masked::unchanged(text);
    }
    let Some(sentinel) = pick_sentinel(text) else {
        tracing::debug!("No free placeholder character; structure left unprotected");
        return Masked::unchanged(text);
    };

    let mut masked = Masked {
        text: String::with_capacity(text.len()),
        preserved: Vec::with_capacity(spans.len()),
        sentinel,
    };
    let mut cursor = 0;

    for (kind, range) in spans {
        masked.text.push_str(&text[cursor..range.start]);
        let placeholder = masked.placeholder(masked.preserved.len());
        masked.text.push_str(&placeholder);
        masked.preserved.push(PreservedSpan {
            kind,
            text: text[range.clone()].to_string(),
        });
        cursor = range.end;
    }
    masked.text.push_str(&text[cursor..]);

    masked
}

fn protected_spans(text: &str, lines: &[Line<'_>]) -> Vec<(PreservedKind, Range<usize>)> {
    let mut spans: Vec<(PreservedKind, Range<usize>)> = Vec::new();

    for block in code::detect(lines, 0) {
        spans.push((PreservedKind::Code, block.range));
    }
    let claimed: Vec<Range<usize>> = spans.iter().map(|(_, r)| r.clone()).collect();
    for table in tables::detect(lines, &claimed, 0) {
        spans.push((PreservedKind::Table, table.range));
    }

    let claimed: Vec<Range<usize>> = spans.iter().map(|(_, r)| r.clone()).collect();
    for token in technical::detect(text, &claimed) {
        if token.kind == TechnicalKind::Formula {
            spans.push((PreservedKind::Formula, whole_lines(lines, &token.range)));
        }
    }
    for line in lines.iter().filter(|l| diagrams::is_diagram_label(l.text)) {
        spans.push((PreservedKind::Diagram, line.start..line.end));
    }

    spans.sort_by_key(|(_, r)| (r.start, std::cmp::Reverse(r.end)));
    let mut accepted: Vec<(PreservedKind, Range<usize>)> = Vec::with_capacity(spans.len());
    for (kind, range) in spans {
        if range.is_empty() {
            continue;
        }
        if accepted.last().is_some_and(|(_, last)| range.start < last.end) {
            continue;
        }
        accepted.push((kind, range));
    }
    accepted
}

/// Widen `range` to the full lines it touches.
fn whole_lines(lines: &[Line<'_>], range: &Range<usize>) -> Range<usize> {
    let start = lines
        .iter()
        .rev()
        .find(|l| l.start <= range.start)
        .map_or(range.start, |l| l.start);
    let end = lines
        .iter()
        .find(|l| l.end >= range.end)
        .map_or(range.end, |l| l.end);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_and_restore() {
        let text = "Intro  text\n| A | B |\n|---|---|\n| 1 | 2 |\nP = V * I\nFigure 1 - Pump\nEnd";
        let masked = extract(text);

        let kinds: Vec<_> = masked.preserved.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PreservedKind::Table, PreservedKind::Formula, PreservedKind::Diagram]
        );
        assert!(!masked.text.contains('|'));
        assert!(masked.text.starts_with("Intro  text\n"));
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn test_plain_text_has_no_placeholders() {
        let masked = extract("Nothing to protect here.");
        assert!(masked.preserved.is_empty());
        assert_eq!(masked.text, "Nothing to protect here.");
    }

    #[test]
    fn test_private_use_text_is_not_mistaken_for_placeholder() {
        let text = "Symbol \u{E000}0\u{E000} and \u{E000}0\u{E001}\n| A | B |\n|---|---|\n| 1 | 2 |";
        let masked = extract(text);
        assert_eq!(masked.preserved.len(), 1);
        assert_ne!(masked.sentinel, '\u{E000}');
        assert_ne!(masked.sentinel, '\u{E001}');
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn test_sentinel_skips_used_characters() {
        assert_eq!(pick_sentinel("plain"), Some('\u{E000}'));
        assert_eq!(pick_sentinel("\u{E000}\u{E001}x"), Some('\u{E002}'));
    }
}
