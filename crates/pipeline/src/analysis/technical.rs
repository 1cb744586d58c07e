//! Technical token detection: measurements, part/model numbers and formulas.

use super::overlaps_any;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

const NUMBER: &str = r"\d+(?:[.,]\d+)?";
const UNIT: &str = r"(?:(?:(?i:mm|cm|km|nm|m|inch(?:es)?|ft|kg|g|lbs?|oz|khz|mhz|ghz|hz|kw|mw|kv|mv|ma|psi|bar|kpa|mpa|rpm|°c|°f|ml|l|ms|s)|V|A|W)\b|%)";

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({n})[ \t]*(?:-|–|to)[ \t]*({n})[ \t]?({u})",
        n = NUMBER,
        u = UNIT
    ))
    .expect("valid measurement range regex")
});

static TOLERANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({n})[ \t]*(?:±|\+/-)[ \t]*({n})(?:[ \t]?({u}))?",
        n = NUMBER,
        u = UNIT
    ))
    .expect("valid tolerance regex")
});

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({n})[ \t]*[x×][ \t]*({n})(?:[ \t]*[x×][ \t]*({n}))?[ \t]?({u})",
        n = NUMBER,
        u = UNIT
    ))
    .expect("valid dimension regex")
});

static SIMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({n})[ \t]?({u})", n = NUMBER, u = UNIT))
        .expect("valid measurement regex")
});

static PART_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{1,3}-?\d{3,}(?:-?[A-Z]+)?\b").expect("valid part number regex")
});

static LABELLED_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?i:P/N|part\s*(?:#|no\.?|number)|model(?:\s*no\.?)?|serial(?:\s*no\.?)?)[ \t]*[:#][ \t]*([A-Z0-9][A-Za-z0-9\-/.]*[A-Za-z0-9])",
    )
    .expect("valid labelled part regex")
});

static FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Za-z][A-Za-z0-9_]*)[ \t]*=[ \t]*([^=\n]+?)[ \t]*$")
        .expect("valid formula regex")
});

static FORMULA_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bformula[ \t]*:[ \t]*([^\n]+)").expect("valid formula label regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TechnicalKind {
    Measurement,
    PartNumber,
    Formula,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalToken {
    pub range: Range<usize>,
    pub kind: TechnicalKind,
    pub text: String,
    /// Numeric part of a measurement, or the identifier of a part/formula
    pub value: Option<String>,
    pub unit: Option<String>,
}

impl TechnicalToken {
    /// `value UNIT` for measurements, e.g. `50 NM`.
    pub fn normalized(&self) -> Option<String> {
        match (&self.value, &self.unit) {
            (Some(value), Some(unit)) if self.kind == TechnicalKind::Measurement => {
                Some(format!("{} {}", value, unit.to_uppercase()))
            }
            _ => None,
        }
    }
}

/// Measurement tokens only.
pub fn measurements(text: &str) -> Vec<TechnicalToken> {
    let mut tokens = Vec::new();
    collect_measurements(text, &mut tokens);
    tokens.sort_by_key(|t| t.range.start);
    tokens
}

/// Part and model numbers only.
pub fn part_numbers(text: &str) -> Vec<TechnicalToken> {
    let mut tokens = Vec::new();
    collect_parts(text, &mut tokens);
    tokens.sort_by_key(|t| t.range.start);
    tokens
}

/// All technical tokens outside `excluded` ranges, sorted by position.
pub(crate) fn detect(text: &str, excluded: &[Range<usize>]) -> Vec<TechnicalToken> {
    let mut tokens = Vec::new();
    collect_measurements(text, &mut tokens);
    collect_parts(text, &mut tokens);
    collect_formulas(text, &mut tokens);

    tokens.retain(|t| !overlaps_any(&t.range, excluded));
    tokens.sort_by_key(|t| (t.range.start, t.range.end));
    tokens
}

fn taken(tokens: &[TechnicalToken], range: &Range<usize>) -> bool {
    tokens
        .iter()
        .any(|t| range.start < t.range.end && t.range.start < range.end)
}

fn collect_measurements(text: &str, tokens: &mut Vec<TechnicalToken>) {
    // Compound forms claim their span before plain `number unit` matches.
    for caps in DIMENSION.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let parts: Vec<&str> = [caps.get(1), caps.get(2), caps.get(3)]
            .into_iter()
            .flatten()
            .map(|g| g.as_str())
            .collect();
        push_measurement(tokens, m.range(), m.as_str(), parts.join(" x "), caps.get(4).map(|u| u.as_str()));
    }
    for caps in RANGE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let value = format!("{}-{}", &caps[1], &caps[2]);
        push_measurement(tokens, m.range(), m.as_str(), value, caps.get(3).map(|u| u.as_str()));
    }
    for caps in TOLERANCE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let value = format!("{} ± {}", &caps[1], &caps[2]);
        push_measurement(tokens, m.range(), m.as_str(), value, caps.get(3).map(|u| u.as_str()));
    }
    for caps in SIMPLE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        push_measurement(tokens, m.range(), m.as_str(), caps[1].to_string(), caps.get(2).map(|u| u.as_str()));
    }
}

fn push_measurement(
    tokens: &mut Vec<TechnicalToken>,
    range: Range<usize>,
    text: &str,
    value: String,
    unit: Option<&str>,
) {
    if taken(tokens, &range) {
        return;
    }
    tokens.push(TechnicalToken {
        range,
        kind: TechnicalKind::Measurement,
        text: text.trim().to_string(),
        value: Some(value),
        unit: unit.map(str::to_string),
    });
}

fn collect_parts(text: &str, tokens: &mut Vec<TechnicalToken>) {
    for caps in LABELLED_PART.captures_iter(text) {
        let (Some(m), Some(id)) = (caps.get(0), caps.get(1)) else { continue };
        if taken(tokens, &m.range()) {
            continue;
        }
        tokens.push(TechnicalToken {
            range: m.range(),
            kind: TechnicalKind::PartNumber,
            text: m.as_str().to_string(),
            value: Some(id.as_str().to_string()),
            unit: None,
        });
    }
    for m in PART_NUMBER.find_iter(text) {
        if taken(tokens, &m.range()) {
            continue;
        }
        tokens.push(TechnicalToken {
            range: m.range(),
            kind: TechnicalKind::PartNumber,
            text: m.as_str().to_string(),
            value: Some(m.as_str().to_string()),
            unit: None,
        });
    }
}

fn collect_formulas(text: &str, tokens: &mut Vec<TechnicalToken>) {
    for caps in FORMULA.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let rhs = &caps[2];
        let computed = rhs
            .chars()
            .any(|c| c.is_ascii_digit() || "+-*/^()√".contains(c));
        let range = m.range();
        if !computed || (taken(tokens, &range) && !spans_line(tokens, &range)) {
            continue;
        }
        // A formula line absorbs the measurements it contains.
        tokens.retain(|t| !(range.start <= t.range.start && t.range.end <= range.end));
        tokens.push(TechnicalToken {
            range: m.range(),
            kind: TechnicalKind::Formula,
            text: m.as_str().trim().to_string(),
            value: Some(caps[1].to_string()),
            unit: None,
        });
    }
    for caps in FORMULA_LABEL.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if taken(tokens, &m.range()) {
            continue;
        }
        tokens.push(TechnicalToken {
            range: m.range(),
            kind: TechnicalKind::Formula,
            text: m.as_str().trim().to_string(),
            value: Some(caps[1].trim().to_string()),
            unit: None,
        });
    }
}

/// True when every token overlapping `range` lies inside it.
fn spans_line(tokens: &[TechnicalToken], range: &Range<usize>) -> bool {
    tokens
        .iter()
        .filter(|t| range.start < t.range.end && t.range.start < range.end)
        .all(|t| range.start <= t.range.start && t.range.end <= range.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(TechnicalKind, String)> {
        detect(text, &[])
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_simple_measurement_normalized() {
        let tokens = measurements("Torque to 50 Nm.");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].normalized().as_deref(), Some("50 NM"));
    }

    #[test]
    fn test_compound_measurements_claim_first() {
        let tokens = measurements("Operate between 10-40 °C at 5 ± 0.5 mm and 20 x 30 cm.");
        let values: Vec<_> = tokens.iter().filter_map(|t| t.value.clone()).collect();
        assert_eq!(values, vec!["10-40", "5 ± 0.5", "20 x 30"]);
    }

    #[test]
    fn test_units_need_a_word_boundary() {
        assert!(measurements("There were 5 sections and 3 apples").is_empty());
        assert_eq!(measurements("Rated 230V / 16A").len(), 2);
    }

    #[test]
    fn test_part_numbers() {
        let found = kinds("Replace filter AB-1234 and P/N: 55-901-X");
        assert_eq!(
            found,
            vec![
                (TechnicalKind::PartNumber, "AB-1234".to_string()),
                (TechnicalKind::PartNumber, "P/N: 55-901-X".to_string()),
            ]
        );
    }

    #[test]
    fn test_formula_lines() {
        let found = kinds("P = V * I\nStatus = OK\nFormula: E = mc^2");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], (TechnicalKind::Formula, "P = V * I".to_string()));
        assert_eq!(found[1].0, TechnicalKind::Formula);
    }

    #[test]
    fn test_excluded_ranges() {
        let text = "x = 1 + 2";
        assert!(detect(text, &[0..text.len()]).is_empty());
    }
}
