//! Figure, diagram and image reference detection.

use super::{lists, overlaps_any, Line};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

/// Captions longer than this are treated as body text.
const MAX_CAPTION_CHARS: usize = 200;

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(figure|fig\.|diagram|chart|graph|image|picture|illustration)[ \t]+([a-z]?\d+(?:[.\-]\d+)*[a-z]?)[ \t]*(?:[:.\-–—][ \t]*(.*?))?[ \t]*$",
    )
    .expect("valid diagram label regex")
});

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(image|figure|diagram|chart|graph|picture|photo|illustration)(?:[ \t:]+([^\]\n]*))?\]")
        .expect("valid diagram placeholder regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagramKind {
    Figure,
    Diagram,
    Chart,
    Image,
    /// Bracketed stand-in left by the extractor, e.g. `[image]`
    Placeholder,
}

impl DiagramKind {
    fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "figure" | "fig." => DiagramKind::Figure,
            "diagram" => DiagramKind::Diagram,
            "chart" | "graph" => DiagramKind::Chart,
            _ => DiagramKind::Image,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, DiagramKind::Image | DiagramKind::Placeholder)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramRef {
    /// Label line plus its caption line, when there is one
    pub range: Range<usize>,
    pub kind: DiagramKind,
    pub reference: String,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub page_number: u32,
}

/// Whether a line is a figure/diagram label.
pub fn is_diagram_label(line: &str) -> bool {
    LABEL.is_match(line)
}

pub(crate) fn detect(
    lines: &[Line<'_>],
    claimed: &[Range<usize>],
    page_number: u32,
) -> Vec<DiagramRef> {
    let mut found = Vec::new();
    let mut consumed_until = 0;

    for (idx, line) in lines.iter().enumerate() {
        if line.start < consumed_until || overlaps_any(&(line.start..line.end.max(line.start + 1)), claimed) {
            continue;
        }

        if let Some(caps) = LABEL.captures(line.text) {
            let title = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty());
            let (caption, end) = caption_after(lines, idx, claimed)
                .map(|l| (Some(l.text.trim().to_string()), l.end))
                .unwrap_or((None, line.end));

            consumed_until = end;
            found.push(DiagramRef {
                range: line.start..end,
                kind: DiagramKind::from_label(&caps[1]),
                reference: caps[2].to_string(),
                title,
                caption,
                page_number,
            });
            continue;
        }

        for caps in PLACEHOLDER.captures_iter(line.text) {
            let Some(whole) = caps.get(0) else { continue };
            let start = line.start + whole.start();
            let mut end = line.start + whole.end();
            let mut caption = None;

            if whole.as_str().len() == line.text.trim().len() {
                if let Some(next) = caption_after(lines, idx, claimed) {
                    caption = Some(next.text.trim().to_string());
                    end = next.end;
                    consumed_until = end;
                }
            }

            found.push(DiagramRef {
                range: start..end,
                kind: DiagramKind::Placeholder,
                reference: caps[1].to_lowercase(),
                title: caps.get(2).map(|m| m.as_str().trim().to_string()).filter(|t| !t.is_empty()),
                caption,
                page_number,
            });
        }
    }

    found
}

/// The next non-blank line after `idx`, when it reads like a caption.
fn caption_after<'a>(lines: &'a [Line<'a>], idx: usize, claimed: &[Range<usize>]) -> Option<&'a Line<'a>> {
    let next = lines[idx + 1..].iter().find(|l| !l.is_blank())?;
    let text = next.text.trim();

    let unsuitable = overlaps_any(&(next.start..next.end), claimed)
        || text.chars().count() > MAX_CAPTION_CHARS
        || text.starts_with('#')
        || LABEL.is_match(next.text)
        || PLACEHOLDER.is_match(next.text)
        || lists::is_list_item(next.text);

    (!unsuitable).then_some(next)
}
