//! Input type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Extracted text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageText {
    /// Raw page text as produced by the extractor
    pub text: String,

    /// 1-based page number
    pub page_number: u32,
}

impl PageText {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number,
        }
    }
}

/// Everything needed to chunk one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub document_id: String,
    pub tenant_id: String,
    pub pages: Vec<PageText>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Caller-supplied facts that override detected document context
    #[serde(default)]
    pub info: Option<DocumentInfo>,
}

impl DocumentInput {
    pub fn new(
        document_id: impl Into<String>,
        tenant_id: impl Into<String>,
        pages: Vec<PageText>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            tenant_id: tenant_id.into(),
            pages,
            title: None,
            author: None,
            info: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Total characters across all pages.
    pub fn text_len(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Known document facts. Any field set here wins over detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub document_type: Option<crate::enhance::DocumentType>,
}
