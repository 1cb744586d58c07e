//! Text normalization for extracted page text.
//!
//! Encoding repair, control character removal and space mapping apply to the
//! whole text. Structured spans (tables, code, formulas, figure labels) are
//! then swapped for placeholders, so the remaining steps only touch prose.
//! Every step is toggleable and records a label only when it changed
//! something.

mod encoding;
mod preserve;
mod quality;

pub use encoding::{fix_encoding, has_mojibake};
pub use preserve::{PreservedKind, PreservedSpan};
pub use quality::{validate_text_quality, TextQualityReport, MIN_VALID_SCORE};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub const FIXED_ENCODING: &str = "Fixed encoding issues";
pub const APPLIED_NFC: &str = "Applied Unicode NFC normalization";
pub const REMOVED_CONTROL: &str = "Removed control characters";
pub const NORMALIZED_QUOTES: &str = "Normalized quotes and dashes";
pub const NORMALIZED_WHITESPACE: &str = "Normalized whitespace";

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\u{9F}]").expect("valid control char regex")
});

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space run regex"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Upper bound on repeated passes; ordinary text settles after the first.
const MAX_PASSES: usize = 32;

/// Step labels in the order the steps run.
const STEP_ORDER: [&str; 5] = [
    FIXED_ENCODING,
    REMOVED_CONTROL,
    APPLIED_NFC,
    NORMALIZED_QUOTES,
    NORMALIZED_WHITESPACE,
];

/// Which normalization steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizeOptions {
    pub preserve_structure: bool,
    pub fix_encoding: bool,
    pub unicode_nfc: bool,
    pub remove_control_chars: bool,
    pub normalize_quotes: bool,
    pub normalize_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            preserve_structure: true,
            fix_encoding: true,
            unicode_nfc: true,
            remove_control_chars: true,
            normalize_quotes: true,
            normalize_whitespace: true,
        }
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedText {
    pub content: String,
    /// Labels of the steps that changed the text, in order
    pub transformations: Vec<String>,
    pub preserved: Vec<PreservedSpan>,
}

/// Normalize `text`. Never fails; running it on its own output is a no-op.
///
/// Cleaning prose can change how its neighbours are detected (a dash turned
/// into a list bullet ends an indented code block), so passes repeat until
/// the text stops changing.
pub fn normalize(text: &str, options: &NormalizeOptions) -> NormalizedText {
    let mut result = normalize_pass(text, options);
    let mut passes = 1;
    // A pass that changed nothing has already reached the fixed point
    let mut settled = result.content == text;

    while !settled && passes < MAX_PASSES {
        let next = normalize_pass(&result.content, options);
        passes += 1;
        settled = next.content == result.content;
        if !settled {
            for label in &next.transformations {
                if !result.transformations.contains(label) {
                    result.transformations.push(label.clone());
                }
            }
            result.transformations.sort_by_key(|label| step_rank(label));
            result.content = next.content;
        }
        result.preserved = next.preserved;
    }
    if !settled {
        tracing::debug!(passes, "Normalization did not settle");
    }

    tracing::trace!(
        input_len = text.len(),
        output_len = result.content.len(),
        preserved = result.preserved.len(),
        steps = result.transformations.len(),
        passes,
        "Normalized text"
    );

    result
}

fn step_rank(label: &str) -> usize {
    STEP_ORDER
        .iter()
        .position(|step| *step == label)
        .unwrap_or(STEP_ORDER.len())
}

fn normalize_pass(text: &str, options: &NormalizeOptions) -> NormalizedText {
    if text.trim().is_empty() {
        return NormalizedText::default();
    }

    let mut transformations = Vec::new();
    let mut record = |label: &str, before: &str, after: &str| {
        if before != after {
            transformations.push(label.to_string());
        }
    };

    // Whole-text steps. Structure detection runs after them so it sees the
    // same lines the next pass will see.
    let mut whitespace_changed = false;
    let mut current = if options.normalize_whitespace {
        let unified = normalize_line_endings(text);
        whitespace_changed = unified != text;
        unified
    } else {
        text.to_string()
    };

    if options.fix_encoding {
        let next = fix_encoding(&current);
        record(FIXED_ENCODING, &current, &next);
        current = next;
    }

    if options.remove_control_chars {
        let next = CONTROL_CHARS.replace_all(&current, "").into_owned();
        record(REMOVED_CONTROL, &current, &next);
        current = next;
    }

    if options.normalize_whitespace {
        let next = map_space_variants(&current);
        whitespace_changed |= next != current;
        current = next;
    }

    // Prose-only steps
    let masked = if options.preserve_structure {
        let masked = preserve::extract(&current);
        current = masked.text.clone();
        Some(masked)
    } else {
        None
    };

    if options.unicode_nfc {
        let next: String = current.nfc().collect();
        record(APPLIED_NFC, &current, &next);
        current = next;
    }

    if options.normalize_quotes {
        let next = normalize_quotes(&current);
        record(NORMALIZED_QUOTES, &current, &next);
        current = next;
    }

    if options.normalize_whitespace {
        let next = normalize_whitespace(&current);
        if whitespace_changed || next != current {
            transformations.push(NORMALIZED_WHITESPACE.to_string());
        }
        current = next;
    }

    match masked {
        Some(masked) => NormalizedText {
            content: masked.restore(&current),
            transformations,
            preserved: masked.preserved,
        },
        None => NormalizedText {
            content: current,
            transformations,
            preserved: Vec::new(),
        },
    }
}

/// Normalize with every step enabled and return only the text.
pub fn clean_for_embedding(text: &str) -> String {
    normalize(text, &NormalizeOptions::default()).content
}

fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2039}' | '\u{203A}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}' => '-',
            other => other,
        })
        .collect()
}

/// Map exotic spaces to a plain space and drop zero-width characters.
fn map_space_variants(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{FEFF}'))
        .map(|c| match c {
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => ' ',
            other => other,
        })
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    let spaced = text.replace('\t', " ");
    let collapsed = SPACE_RUN.replace_all(&spaced, " ");
    let trimmed_lines = collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> NormalizedText {
        normalize(text, &NormalizeOptions::default())
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(""), NormalizedText::default());
        assert_eq!(run(" \n\t \n"), NormalizedText::default());
    }

    #[test]
    fn test_whitespace_and_line_endings() {
        let result = run("  Hello\u{00A0}\u{00A0}world \r\n\r\n\r\n\r\nNext\tline  ");
        assert_eq!(result.content, "Hello world\n\nNext line");
        assert_eq!(result.transformations, vec![NORMALIZED_WHITESPACE]);
    }

    #[test]
    fn test_labels_only_for_changes() {
        let result = run("Plain text.");
        assert_eq!(result.content, "Plain text.");
        assert!(result.transformations.is_empty());

        let result = run("â€œQuotedâ€\u{9D} â€” done");
        assert_eq!(result.content, "\"Quoted\" - done");
        assert_eq!(result.transformations, vec![FIXED_ENCODING, NORMALIZED_QUOTES]);
    }

    #[test]
    fn test_control_chars_removed() {
        let result = run("a\u{0007}b\u{0000}c");
        assert_eq!(result.content, "abc");
        assert_eq!(result.transformations, vec![REMOVED_CONTROL]);
    }

    #[test]
    fn test_nfc() {
        let result = run("cafe\u{0301}");
        assert_eq!(result.content, "café");
        assert_eq!(result.transformations, vec![APPLIED_NFC]);
    }

    #[test]
    fn test_tables_survive_verbatim() {
        let text = "Intro\u{201C}\n|  Part  |  Torque  |\n|--------|----------|\n|  M8    |  25 Nm   |\nOutro";
        let result = run(text);
        assert!(result
            .content
            .contains("|  Part  |  Torque  |\n|--------|----------|\n|  M8    |  25 Nm   |"));
        assert!(result.content.starts_with("Intro\""));
        assert_eq!(result.preserved.len(), 1);
        assert_eq!(result.preserved[0].kind, PreservedKind::Table);
    }

    #[test]
    fn test_steps_can_be_disabled() {
        let options = NormalizeOptions {
            normalize_whitespace: false,
            ..NormalizeOptions::default()
        };
        let result = normalize("a  b \u{2014} c", &options);
        assert_eq!(result.content, "a  b - c");
    }

    #[test]
    fn test_dash_bullet_releases_indented_block() {
        let result = run("\u{2014} d\n\n    e\n    e");
        assert_eq!(result.content, "- d\n\ne\ne");
        assert_eq!(result.transformations, vec![NORMALIZED_QUOTES, NORMALIZED_WHITESPACE]);
        assert!(result.preserved.is_empty());
    }

    #[test]
    fn test_control_chars_removed_before_structure_detection() {
        let result = run("2. d\n\u{7}\n\n    e\n    e");
        assert_eq!(result.content, "2. d\n\ne\ne");
        assert_eq!(result.transformations, vec![REMOVED_CONTROL, NORMALIZED_WHITESPACE]);
    }

    #[test]
    fn test_nbsp_before_fence_is_mapped_first() {
        let result = run("\u{a0}```\n```\n ```");
        assert_eq!(result.content, " ```\n```\n```");
        assert_eq!(result.preserved.len(), 1);
        assert_eq!(result.preserved[0].kind, PreservedKind::Code);
    }

    #[test]
    fn test_private_use_input_survives() {
        let text = "Glyph \u{E000}0\u{E001} here\n| A | B |\n|---|---|\n| 1 | 2 |";
        let result = run(text);
        assert_eq!(result.content, text);
    }

    #[test]
    fn test_idempotent() {
        let text = "  â€œManualâ€\u{9D}\r\n\r\n\r\n| A | B |\n|---|---|\n| 1 | 2 |\n\n    code line\n    more code\n\nTail\u{00A0} text ";
        let once = clean_for_embedding(text);
        assert_eq!(clean_for_embedding(&once), once);
    }
}
