//! Document-level context from the first pages.

use super::types::{DocumentContext, DocumentType, Language};
use crate::types::{DocumentInfo, PageText};
use regex::Regex;
use std::sync::LazyLock;

/// Only the opening pages carry title-page facts.
const LEADING_PAGES: usize = 3;

static MANUFACTURER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:manufactured by|manufacturer:|©|copyright)[ \t]*([A-Z][A-Za-z &]+?)[ \t]*(?:\n|\.|$)")
        .expect("valid manufacturer regex")
});

static MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmodel(?:[ \t]+(?:number|no\.?))?[ \t]*[:#]?[ \t]*([A-Z0-9\-]*\d[A-Z0-9\-]*)")
        .expect("valid model regex")
});

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:version|revision|rev\.?)[ \t]*:?[ \t]*(\d+(?:\.\d+)*|[A-Z]\b)")
        .expect("valid version regex")
});

/// Ordered keyword table; the first matching row wins.
const TYPE_KEYWORDS: [(DocumentType, &[&str]); 5] = [
    (DocumentType::UserManual, &["user manual", "user guide"]),
    (DocumentType::ServiceManual, &["service manual", "repair manual"]),
    (DocumentType::InstallationGuide, &["installation guide", "setup guide"]),
    (DocumentType::PartsCatalog, &["parts catalog", "parts list"]),
    (DocumentType::TechnicalSpecification, &["technical specification"]),
];

fn leading_text(pages: &[PageText], separator: &str) -> String {
    pages
        .iter()
        .take(LEADING_PAGES)
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn detect_document_type(pages: &[PageText]) -> DocumentType {
    let text = leading_text(pages, " ").to_lowercase();

    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or_else(|| {
            if text.contains("safety") && text.contains("instruction") {
                DocumentType::SafetyManual
            } else {
                DocumentType::GeneralManual
            }
        })
}

/// Guess English, Portuguese or Spanish from common function words.
/// Technical text with no clear signal counts as English.
pub fn detect_language(text: &str) -> Language {
    const PORTUGUESE: &[&str] = &[
        "não", "você", "também", "está", "será", "é", "são", "para", "com", "uma", "função", "código",
    ];
    const SPANISH: &[&str] = &[
        "está", "usted", "también", "será", "es", "el", "los", "las", "para", "con", "una", "función",
    ];
    const ENGLISH: &[&str] = &[
        "the", "is", "are", "was", "were", "this", "that", "with", "and", "for",
    ];

    let sample: String = text.chars().take(500).collect::<String>().to_lowercase();
    let words: Vec<&str> = sample
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let score = |list: &[&str]| words.iter().filter(|w| list.contains(w)).count();

    let pt = score(PORTUGUESE);
    let es = score(SPANISH) + usize::from(sample.contains('ñ'));
    let en = score(ENGLISH);

    if pt > en && pt > es {
        Language::Portuguese
    } else if es > en && es > pt {
        Language::Spanish
    } else {
        Language::English
    }
}

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Context shared by every chunk of a document. Fields set in `info` win
/// over detection.
pub fn build_document_context(pages: &[PageText], info: Option<&DocumentInfo>) -> DocumentContext {
    let leading = leading_text(pages, "\n");
    let mut context = DocumentContext {
        page_count: pages.len(),
        document_type: detect_document_type(pages),
        title: None,
        language: (!leading.trim().is_empty()).then(|| detect_language(&leading)),
        manufacturer: capture(&MANUFACTURER, &leading),
        model: capture(&MODEL, &leading),
        version: capture(&VERSION, &leading),
    };

    if let Some(info) = info {
        if info.title.is_some() {
            context.title = info.title.clone();
        }
        if info.manufacturer.is_some() {
            context.manufacturer = info.manufacturer.clone();
        }
        if info.model.is_some() {
            context.model = info.model.clone();
        }
        if info.version.is_some() {
            context.version = info.version.clone();
        }
        if let Some(kind) = info.document_type {
            context.document_type = kind;
        }
    }

    context
}
