//! Section hierarchy context from parent links.

use super::types::{SectionContext, SectionType};
use crate::chunk::Chunk;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static SECTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+").expect("valid section number regex"));

/// Ordered keyword table; the first matching row wins.
const SECTION_KEYWORDS: [(SectionType, &[&str]); 8] = [
    (SectionType::Introduction, &["introduction", "overview"]),
    (SectionType::Safety, &["safety", "warning", "caution"]),
    (SectionType::Specifications, &["specification", "technical data"]),
    (SectionType::Procedures, &["procedure", "instruction", "how to"]),
    (SectionType::Troubleshooting, &["troubleshoot", "problem", "solution"]),
    (SectionType::Maintenance, &["maintenance", "service", "repair"]),
    (SectionType::Parts, &["parts", "component", "assembly"]),
    (SectionType::Appendix, &["appendix", "glossary", "reference"]),
];

pub fn detect_section_type(text: &str) -> SectionType {
    let lower = text.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(SectionType::Other, |(kind, _)| *kind)
}

pub fn section_number(header: &str) -> Option<String> {
    SECTION_NUMBER
        .captures(header.trim())
        .map(|caps| caps[1].to_string())
}

/// Lookup tables over one chunk list, built once per enhancement pass.
pub(crate) struct SectionIndex<'a> {
    chunks: &'a [Chunk],
    by_id: HashMap<&'a str, usize>,
    groups: HashMap<(u32, Option<&'a str>), Vec<usize>>,
}

impl<'a> SectionIndex<'a> {
    pub fn new(chunks: &'a [Chunk]) -> Self {
        let mut groups: HashMap<(u32, Option<&str>), Vec<usize>> = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let rel = &chunk.relationships;
            groups
                .entry((rel.hierarchy_level, rel.parent_chunk_id.as_deref()))
                .or_default()
                .push(i);
        }

        Self {
            chunks,
            by_id: chunks.iter().enumerate().map(|(i, c)| (c.id.as_str(), i)).collect(),
            groups,
        }
    }

    /// Ancestor chunks, root first.
    fn ancestors(&self, index: usize) -> Vec<&'a Chunk> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([index]);
        let mut current = index;

        while let Some(&parent) = self.chunks[current]
            .relationships
            .parent_chunk_id
            .as_deref()
            .and_then(|id| self.by_id.get(id))
        {
            if !visited.insert(parent) {
                break;
            }
            found.push(&self.chunks[parent]);
            current = parent;
        }

        found.reverse();
        found
    }

    pub fn context(&self, index: usize) -> SectionContext {
        let chunk = &self.chunks[index];
        let rel = &chunk.relationships;
        let header = chunk.metadata.section_header.as_deref();

        let parent_sections: Vec<String> = self
            .ancestors(index)
            .iter()
            .filter_map(|c| c.metadata.section_header.clone())
            .collect();
        let mut full_path = parent_sections.clone();
        full_path.extend(header.map(str::to_string));

        let group = self
            .groups
            .get(&(rel.hierarchy_level, rel.parent_chunk_id.as_deref()))
            .map(Vec::as_slice)
            .unwrap_or_default();

        SectionContext {
            full_path,
            depth: rel.hierarchy_level,
            section_number: header.and_then(section_number),
            parent_sections,
            section_type: detect_section_type(header.unwrap_or(&chunk.content)),
            sibling_count: group.len().saturating_sub(1),
            position_in_section: group.iter().position(|&i| i == index).map_or(1, |p| p + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships;
    use crate::tests::fixtures::chunk_at_level;

    #[test]
    fn test_section_type_order() {
        assert_eq!(detect_section_type("Safety Overview"), SectionType::Introduction);
        assert_eq!(detect_section_type("Repair of the pump"), SectionType::Maintenance);
        assert_eq!(detect_section_type("Torque values"), SectionType::Other);
    }

    #[test]
    fn test_section_number() {
        assert_eq!(section_number("3.2.1 Removing the cover").as_deref(), Some("3.2.1"));
        assert_eq!(section_number("4. Wiring").as_deref(), Some("4"));
        assert_eq!(section_number("Wiring"), None);
    }

    #[test]
    fn test_context_walks_parents() {
        let mut chunks: Vec<Chunk> = [(0, "1 Maintenance"), (1, "1.1 Filters"), (1, "1.2 Belts"), (2, "1.2.1 Tension")]
            .iter()
            .enumerate()
            .map(|(i, (level, header))| {
                let mut chunk = chunk_at_level("doc", i, *level);
                chunk.metadata.section_header = Some(header.to_string());
                chunk
            })
            .collect();
        relationships::link_sequence(&mut chunks);
        relationships::assign_hierarchy(&mut chunks);

        let index = SectionIndex::new(&chunks);
        let deepest = index.context(3);
        assert_eq!(deepest.full_path, vec!["1 Maintenance", "1.2 Belts", "1.2.1 Tension"]);
        assert_eq!(deepest.parent_sections, vec!["1 Maintenance", "1.2 Belts"]);
        assert_eq!(deepest.depth, 2);
        assert_eq!(deepest.section_number.as_deref(), Some("1.2.1"));

        let belts = index.context(2);
        assert_eq!(belts.sibling_count, 1);
        assert_eq!(belts.position_in_section, 2);
        assert_eq!(belts.section_type, SectionType::Other);
        assert_eq!(index.context(0).section_type, SectionType::Maintenance);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut chunks: Vec<Chunk> = (0..2).map(|i| chunk_at_level("doc", i, 1)).collect();
        chunks[0].relationships.parent_chunk_id = Some(chunks[1].id.clone());
        chunks[1].relationships.parent_chunk_id = Some(chunks[0].id.clone());
        let context = SectionIndex::new(&chunks).context(0);
        assert_eq!(context.depth, 1);
    }
}
