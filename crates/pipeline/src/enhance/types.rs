//! Enrichment blocks attached to chunk metadata by the enhancer.

use serde::{Deserialize, Serialize};

/// Document classification from keywords on the first pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    UserManual,
    ServiceManual,
    InstallationGuide,
    PartsCatalog,
    TechnicalSpecification,
    SafetyManual,
    GeneralManual,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::UserManual => "user_manual",
            DocumentType::ServiceManual => "service_manual",
            DocumentType::InstallationGuide => "installation_guide",
            DocumentType::PartsCatalog => "parts_catalog",
            DocumentType::TechnicalSpecification => "technical_specification",
            DocumentType::SafetyManual => "safety_manual",
            DocumentType::GeneralManual => "general_manual",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural language guess for the document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Portuguese,
    Spanish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContext {
    pub page_count: usize,
    pub document_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Introduction,
    Safety,
    Specifications,
    Procedures,
    Troubleshooting,
    Maintenance,
    Parts,
    Appendix,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionContext {
    /// Section headers from the root chunk down to this one
    pub full_path: Vec<String>,
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_number: Option<String>,
    /// Ancestor headers, root first
    pub parent_sections: Vec<String>,
    pub section_type: SectionType,
    /// Chunks with the same parent and level, excluding this one
    pub sibling_count: usize,
    /// 1-based position among those siblings
    pub position_in_section: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub average_word_length: f64,
    /// Flesch reading ease, clamped to 0..=100
    pub readability_score: f64,
    /// Technical terms per word, at most 1.0
    pub technical_density: f64,
    pub unique_terms: usize,
    pub key_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Part,
    Measurement,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub value: String,
    /// `value UNIT` for measurements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<String>,
    /// WARNING, CAUTION, DANGER or NOTICE for warnings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    SeeAlso,
    ReferTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Section,
    Figure,
    Table,
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub target: String,
    pub target_type: TargetType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticContext {
    pub topics: Vec<String>,
    pub key_phrases: Vec<String>,
    pub entities: Vec<Entity>,
    pub cross_references: Vec<CrossReference>,
    pub warnings: Vec<String>,
    pub procedures: Vec<String>,
}

impl SemanticContext {
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }
}

/// Milliseconds spent per pipeline phase for the whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub extraction_ms: u64,
    pub preprocessing_ms: u64,
    pub chunking_ms: u64,
    pub enhancement_ms: u64,
    pub total_ms: u64,
}

/// Scores in 0.0..=1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub completeness: f64,
    pub coherence: f64,
    pub relevance: f64,
    pub structural_integrity: f64,
    pub embedding_readiness: f64,
    /// Mean of the five scores above
    pub overall: f64,
}
