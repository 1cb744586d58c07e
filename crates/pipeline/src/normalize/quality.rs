//! Before/after comparison of normalized text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Reports scoring below this are not valid.
pub const MIN_VALID_SCORE: u32 = 70;

const REPETITION_SCAN_CHARS: usize = 5000;
const MIN_REPEAT_UNIT: usize = 10;
const MAX_REPEAT_UNIT: usize = 100;

static MOJIBAKE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Ã[\u{80}-\u{BF}]|Â[\u{80}-\u{BF}]|â€").expect("valid mojibake marker regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextQualityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    /// 0 to 100
    pub quality_score: u32,
}

/// Score how well `processed` kept the content of `original`.
pub fn validate_text_quality(original: &str, processed: &str) -> TextQualityReport {
    let mut issues = Vec::new();
    let mut penalty = 0u32;

    let original_len = original.chars().count();
    let processed_len = processed.chars().count();
    if original_len > 0 {
        let loss = 1.0 - processed_len as f64 / original_len as f64;
        if loss > 0.5 {
            issues.push(format!("Significant content loss: {:.0}%", loss * 100.0));
            penalty += 30;
        } else if loss > 0.2 {
            issues.push(format!("Moderate content loss: {:.0}%", loss * 100.0));
            penalty += 15;
        }
    }

    let table_lines = |s: &str| s.lines().filter(|l| l.matches('|').count() >= 2).count();
    let before = table_lines(original);
    if before >= 2 && table_lines(processed) * 2 < before {
        issues.push("Table structure may be degraded".to_string());
        penalty += 20;
    }

    if processed.contains('\u{FFFD}') {
        issues.push("Contains replacement characters".to_string());
        penalty += 25;
    }

    if MOJIBAKE_MARKER.is_match(processed) {
        issues.push("Encoding issues remain".to_string());
        penalty += 10;
    }

    if has_repetition(processed) {
        issues.push("Repeated text detected".to_string());
        penalty += 15;
    }

    let quality_score = 100u32.saturating_sub(penalty);
    TextQualityReport {
        is_valid: quality_score >= MIN_VALID_SCORE,
        issues,
        quality_score,
    }
}

/// A unit of 10 to 100 chars with a letter or digit, three times in a row.
fn has_repetition(text: &str) -> bool {
    let chars: Vec<char> = text.chars().take(REPETITION_SCAN_CHARS).collect();

    for unit in MIN_REPEAT_UNIT..=MAX_REPEAT_UNIT {
        if unit * 3 > chars.len() {
            break;
        }
        for start in 0..=chars.len() - unit * 3 {
            let first = &chars[start..start + unit];
            if first.iter().all(|c| *c == first[0]) || !first.iter().any(|c| c.is_alphanumeric()) {
                continue;
            }
            if first == &chars[start + unit..start + 2 * unit]
                && first == &chars[start + 2 * unit..start + 3 * unit]
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_result_is_valid() {
        let report = validate_text_quality("Hello   world.", "Hello world.");
        assert!(report.is_valid);
        assert_eq!(report.quality_score, 100);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_content_loss_penalties() {
        let original = "a".repeat(100);
        assert_eq!(validate_text_quality(&original, &"a".repeat(70)).quality_score, 85);
        assert_eq!(validate_text_quality(&original, &"a".repeat(40)).quality_score, 70);
    }

    #[test]
    fn test_replacement_and_mojibake() {
        let report = validate_text_quality("don\u{FFFD}t cafÃ©", "don\u{FFFD}t cafÃ©");
        assert_eq!(report.quality_score, 65);
        assert!(!report.is_valid);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_table_degradation() {
        let original = "| a | b |\n| 1 | 2 |\n| 3 | 4 |\n| 5 | 6 |";
        let report = validate_text_quality(original, "a b\n1 2\n3 4\n5 6 and more text");
        assert!(report.issues.iter().any(|i| i.contains("Table")));
    }

    #[test]
    fn test_repetition() {
        let looped = "check the valve. ".repeat(3);
        assert!(has_repetition(&looped));
        assert!(!has_repetition("--------------------------------------"));
        assert!(!has_repetition("A normal sentence without loops."));
    }
}
