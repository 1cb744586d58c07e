//! Table detection: pipe-delimited, ASCII-bordered and space-aligned rows.

use super::{overlaps_any, Line};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

static ALIGNED_CELLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|[ ]{2,}").expect("valid aligned cell regex"));

static CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:table|figure|chart)\s+\d+").expect("valid table caption regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableStyle {
    Pipe,
    Bordered,
    Aligned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpan {
    pub range: Range<usize>,
    pub style: TableStyle,
    pub header: Vec<String>,
    /// Data rows, padded or truncated to the header width
    pub rows: Vec<Vec<String>>,
    pub caption: Option<String>,
    pub page_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Separator,
    Pipe,
    Aligned,
}

/// Whether a single line looks like part of a table.
pub fn is_table_line(line: &str) -> bool {
    classify(line).is_some()
}

fn classify(line: &str) -> Option<RowKind> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_separator(trimmed) {
        return Some(RowKind::Separator);
    }
    let pipes = trimmed.matches('|').count();
    let has_content = trimmed.chars().any(|c| c.is_alphanumeric());
    if pipes >= 2 && has_content {
        return Some(RowKind::Pipe);
    }
    let cells = ALIGNED_CELLS
        .split(trimmed)
        .filter(|c| !c.trim().is_empty())
        .count();
    if cells >= 3 {
        return Some(RowKind::Aligned);
    }
    None
}

fn is_separator(trimmed: &str) -> bool {
    let rules = trimmed.chars().filter(|c| *c == '-' || *c == '=').count();
    rules >= 3 && trimmed.chars().all(|c| "|+-=: ".contains(c))
}

fn cells(line: &str, kind: RowKind) -> Vec<String> {
    let trimmed = line.trim();
    match kind {
        RowKind::Pipe => {
            let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
            let inner = inner.strip_suffix('|').unwrap_or(inner);
            inner.split('|').map(|c| c.trim().to_string()).collect()
        }
        RowKind::Aligned => ALIGNED_CELLS
            .split(trimmed)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        RowKind::Separator => Vec::new(),
    }
}

pub(crate) fn detect(lines: &[Line<'_>], claimed: &[Range<usize>], page_number: u32) -> Vec<TableSpan> {
    let mut tables = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(first_kind) = row_kind(&lines[i], claimed) else {
            i += 1;
            continue;
        };

        let mut run = vec![(i, first_kind)];
        let mut j = i + 1;
        while j < lines.len() {
            match row_kind(&lines[j], claimed) {
                Some(kind) => run.push((j, kind)),
                None => break,
            }
            j += 1;
        }

        let data_rows = run.iter().filter(|(_, k)| *k != RowKind::Separator).count();
        if run.len() >= 2 && data_rows >= 1 {
            tables.push(build_table(lines, &run, page_number));
        }
        i = j;
    }

    tables
}

fn row_kind(line: &Line<'_>, claimed: &[Range<usize>]) -> Option<RowKind> {
    if overlaps_any(&(line.start..line.end.max(line.start + 1)), claimed) {
        return None;
    }
    classify(line.text)
}

fn build_table(lines: &[Line<'_>], run: &[(usize, RowKind)], page_number: u32) -> TableSpan {
    let first = run[0].0;
    let last = run[run.len() - 1].0;

    let bordered = run
        .iter()
        .any(|(idx, k)| *k == RowKind::Separator && lines[*idx].text.trim_start().starts_with('+'));
    let piped = run.iter().any(|(_, k)| *k == RowKind::Pipe);
    let style = if bordered {
        TableStyle::Bordered
    } else if piped {
        TableStyle::Pipe
    } else {
        TableStyle::Aligned
    };

    let mut data = run
        .iter()
        .filter(|(_, k)| *k != RowKind::Separator)
        .map(|(idx, k)| cells(lines[*idx].text, *k));

    let header = data.next().unwrap_or_default();
    let width = header.len();
    let rows = data
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect();

    let caption = [first.checked_sub(1), Some(last + 1)]
        .into_iter()
        .flatten()
        .filter_map(|idx| lines.get(idx))
        .find(|l| CAPTION.is_match(l.text))
        .map(|l| l.text.trim().to_string());

    TableSpan {
        range: lines[first].start..lines[last].end,
        style,
        header,
        rows,
        caption,
        page_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::split_lines;

    fn run(text: &str) -> Vec<TableSpan> {
        detect(&split_lines(text), &[], 1)
    }

    #[test]
    fn test_pipe_table_with_caption() {
        let text = "Table 3 Torque values\n| Bolt | Torque | Notes |\n|---|---|---|\n| M8 | 25 Nm |\n| M10 | 50 Nm | dry |\nAfter the table.";
        let tables = run(text);
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.style, TableStyle::Pipe);
        assert_eq!(table.header, vec!["Bolt", "Torque", "Notes"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["M8", "25 Nm", ""]);
        assert_eq!(table.caption.as_deref(), Some("Table 3 Torque values"));
        assert!(text[table.range.clone()].ends_with("| dry |"));
    }

    #[test]
    fn test_bordered_table() {
        let text = "+------+-------+\n| Pin  | Signal |\n+------+-------+\n| 1    | GND   |\n+------+-------+";
        let tables = run(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].style, TableStyle::Bordered);
        assert_eq!(tables[0].rows, vec![vec!["1".to_string(), "GND".to_string()]]);
    }

    #[test]
    fn test_aligned_table() {
        let text = "Model   Voltage   Weight\nX100    230 V     12 kg\nX200    110 V     14 kg\n";
        let tables = run(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].style, TableStyle::Aligned);
        assert_eq!(tables[0].header, vec!["Model", "Voltage", "Weight"]);
        assert_eq!(tables[0].rows[1], vec!["X200", "110 V", "14 kg"]);
    }

    #[test]
    fn test_single_row_is_not_a_table() {
        assert!(run("just | one | row").is_empty());
        assert!(run("Paragraph.\n\n-----\n\nParagraph.").is_empty());
    }
}
