//! Semantic context: topics, phrases, entities, references, warnings and
//! procedure steps.

use super::types::{CrossReference, Entity, EntityKind, ReferenceKind, SemanticContext, TargetType};
use crate::analysis::technical;
use regex::Regex;
use std::sync::LazyLock;

const TOPIC_LIMIT: usize = 5;
const PHRASE_LIMIT: usize = 10;
const PROCEDURE_LIMIT: usize = 10;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+[ \t]+(.+?)[ \t]*$").expect("valid heading regex"));

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid emphasis regex"));

static PROPER_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:the\s+)?[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3}\b").expect("valid phrase regex")
});

static COMPONENT_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\w+[ \t]+(?:system|component|assembly|module|unit)\b")
        .expect("valid component phrase regex")
});

static LABELLED_WARNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(WARNING|CAUTION|DANGER|NOTICE):\s*([^.!]+[.!])").expect("valid warning regex")
});

static IMPERATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Do not|Never|Always|Must)\s+[^.!]+[.!]").expect("valid imperative regex")
});

static SECTION_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:see|refer to)\s+(?:section|chapter)\s+(\d+(?:\.\d+)*)")
        .expect("valid section reference regex")
});

static FIGURE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:figure|fig\.?)\s+(\d+(?:\.\d+)*)").expect("valid figure reference regex")
});

static TABLE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:see|refer to)\s+table\s+(\d+(?:\.\d+)*)").expect("valid table reference regex")
});

static PAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:page|p\.)\s*(\d+)").expect("valid page reference regex"));

static NUMBERED_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+(.+?)[ \t]*$").expect("valid step regex"));

static ACTION_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*((?:Remove|Install|Connect|Disconnect|Check|Verify|Test|Replace|Adjust|Tighten|Loosen)[ \t]+[^.\n]+\.?)",
    )
    .expect("valid action step regex")
});

fn push_unique(into: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !into.iter().any(|v| v == value) {
        into.push(value.to_string());
    }
}

pub fn extract_semantic_context(content: &str) -> SemanticContext {
    SemanticContext {
        topics: topics(content),
        key_phrases: key_phrases(content),
        entities: entities(content),
        cross_references: cross_references(content),
        warnings: warnings(content),
        procedures: procedures(content),
    }
}

fn topics(content: &str) -> Vec<String> {
    let mut topics = Vec::new();
    for caps in HEADING.captures_iter(content).chain(EMPHASIS.captures_iter(content)) {
        push_unique(&mut topics, &caps[1]);
    }
    topics.truncate(TOPIC_LIMIT);
    topics
}

fn key_phrases(content: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    for m in PROPER_PHRASE
        .find_iter(content)
        .chain(COMPONENT_PHRASE.find_iter(content))
    {
        push_unique(&mut phrases, m.as_str());
    }
    phrases.truncate(PHRASE_LIMIT);
    phrases
}

/// Part numbers, normalized measurements and labelled warnings.
pub fn entities(content: &str) -> Vec<Entity> {
    let mut entities: Vec<Entity> = technical::part_numbers(content)
        .into_iter()
        .map(|token| Entity {
            kind: EntityKind::Part,
            value: token.value.unwrap_or(token.text),
            normalized_value: None,
            category: None,
            confidence: 0.9,
        })
        .collect();

    entities.extend(technical::measurements(content).into_iter().map(|token| Entity {
        kind: EntityKind::Measurement,
        normalized_value: token.normalized(),
        value: token.text,
        category: None,
        confidence: 0.95,
    }));

    entities.extend(LABELLED_WARNING.captures_iter(content).map(|caps| Entity {
        kind: EntityKind::Warning,
        value: caps[2].trim().to_string(),
        normalized_value: None,
        category: Some(caps[1].to_uppercase()),
        confidence: 1.0,
    }));

    entities
}

fn cross_references(content: &str) -> Vec<CrossReference> {
    let families: [(&Regex, ReferenceKind, TargetType); 4] = [
        (&SECTION_REF, ReferenceKind::SeeAlso, TargetType::Section),
        (&FIGURE_REF, ReferenceKind::ReferTo, TargetType::Figure),
        (&TABLE_REF, ReferenceKind::ReferTo, TargetType::Table),
        (&PAGE_REF, ReferenceKind::SeeAlso, TargetType::Page),
    ];

    let mut references: Vec<CrossReference> = Vec::new();
    for (regex, kind, target_type) in families {
        for caps in regex.captures_iter(content) {
            let reference = CrossReference {
                kind,
                target: caps[1].to_string(),
                target_type,
            };
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
    }
    references
}

fn warnings(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    for caps in LABELLED_WARNING.captures_iter(content) {
        push_unique(&mut warnings, &caps[2]);
    }
    for m in IMPERATIVE.find_iter(content) {
        push_unique(&mut warnings, m.as_str());
    }
    warnings
}

fn procedures(content: &str) -> Vec<String> {
    let mut steps = Vec::new();
    for caps in NUMBERED_STEP
        .captures_iter(content)
        .chain(ACTION_STEP.captures_iter(content))
    {
        push_unique(&mut steps, &caps[1]);
    }
    steps.truncate(PROCEDURE_LIMIT);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_and_measurement_entities() {
        let context = extract_semantic_context("WARNING: Disconnect power. Torque to 50 Nm.");

        let warnings: Vec<_> = context.entities_of(EntityKind::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category.as_deref(), Some("WARNING"));
        assert_eq!(warnings[0].value, "Disconnect power.");

        let measurements: Vec<_> = context.entities_of(EntityKind::Measurement).collect();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].normalized_value.as_deref(), Some("50 NM"));

        assert_eq!(context.warnings, vec!["Disconnect power."]);
    }

    #[test]
    fn test_part_entities() {
        let parts: Vec<_> = entities("Replace filter AB-1234 with the kit.")
            .into_iter()
            .filter(|e| e.kind == EntityKind::Part)
            .collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].value, "AB-1234");
    }

    #[test]
    fn test_cross_references() {
        let refs = cross_references("See section 4.2 and Figure 3. Details on page 17.");
        assert!(refs.contains(&CrossReference {
            kind: ReferenceKind::SeeAlso,
            target: "4.2".to_string(),
            target_type: TargetType::Section,
        }));
        assert!(refs.iter().any(|r| r.target_type == TargetType::Figure && r.target == "3"));
        assert!(refs.iter().any(|r| r.target_type == TargetType::Page && r.target == "17"));
    }

    #[test]
    fn test_procedures_and_topics() {
        let text = "## Belt Replacement\n1. Loosen the tensioner.\n2. Remove the old belt.\nTighten the bolts evenly.\nUse **torque wrench** only.";
        let context = extract_semantic_context(text);
        assert_eq!(
            context.procedures,
            vec!["Loosen the tensioner.", "Remove the old belt.", "Tighten the bolts evenly."]
        );
        assert_eq!(context.topics, vec!["Belt Replacement", "torque wrench"]);
    }

    #[test]
    fn test_imperative_warnings() {
        let context = extract_semantic_context("Never open the cover while running. Always wear gloves.");
        assert_eq!(
            context.warnings,
            vec!["Never open the cover while running.", "Always wear gloves."]
        );
    }
}
