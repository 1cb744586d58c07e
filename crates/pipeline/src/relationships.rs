//! Chunk relationship graph: sequence links, section hierarchy, validation
//! and repair.
//!
//! Links are stored on each chunk as ids. Every walk over parent or child
//! links carries a visited set, so malformed input cannot loop forever.

use crate::chunk::Chunk;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Adjacency view over a chunk list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkGraph {
    /// Chunk ids in document order
    pub nodes: Vec<String>,
    /// Outgoing edges: next chunk and children
    pub edges: BTreeMap<String, BTreeSet<String>>,
    /// Chunks with no previous chunk and no parent
    pub roots: BTreeSet<String>,
    /// Chunks with no next chunk and no children
    pub leaves: BTreeSet<String>,
}

/// Level-grouped view over a chunk list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkHierarchy {
    pub levels: BTreeMap<u32, Vec<String>>,
    pub parents: BTreeMap<String, String>,
    pub children: BTreeMap<String, Vec<String>>,
    pub siblings: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    Previous,
    Next,
    Parent,
    Child,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkKind::Previous => "previous",
            LinkKind::Next => "next",
            LinkKind::Parent => "parent",
            LinkKind::Child => "child",
        };
        f.write_str(name)
    }
}

/// One broken invariant found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelationshipError {
    #[error("Chunk {chunk_id} references non-existent {link} chunk {target}")]
    Dangling {
        chunk_id: String,
        link: LinkKind,
        target: String,
    },

    #[error("Chunk {chunk_id} references itself as {link}")]
    SelfReference { chunk_id: String, link: LinkKind },

    #[error("Chunk {chunk_id} and {other_id} have inconsistent prev/next relationship")]
    AsymmetricSequence { chunk_id: String, other_id: String },

    #[error("Chunk {chunk_id} (level {level}) has parent {parent_id} at level {parent_level} or later in the document")]
    ParentOrder {
        chunk_id: String,
        parent_id: String,
        level: u32,
        parent_level: u32,
    },

    #[error("Child list of {parent_id} disagrees with the parent of {child_id}")]
    ChildMismatch { parent_id: String, child_id: String },
}

/// Result of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<RelationshipError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipStats {
    pub total_chunks: usize,
    pub hierarchy_levels: usize,
    pub max_depth: u32,
    pub avg_children_per_chunk: f64,
    pub root_chunks: usize,
    pub leaf_chunks: usize,
    /// No parent, no children and no sequence neighbours
    pub orphaned_chunks: usize,
}

fn index_of(chunks: &[Chunk]) -> HashMap<&str, usize> {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect()
}

/// Link every chunk to its neighbours in list order.
pub fn link_sequence(chunks: &mut [Chunk]) {
    let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.relationships.previous_chunk_id = i.checked_sub(1).map(|p| ids[p].clone());
        chunk.relationships.next_chunk_id = ids.get(i + 1).cloned();
    }
}

/// Set each chunk's parent to the nearest earlier chunk with a strictly lower
/// hierarchy level, and rebuild every child list from those parents.
pub fn assign_hierarchy(chunks: &mut [Chunk]) {
    for chunk in chunks.iter_mut() {
        chunk.relationships.parent_chunk_id = None;
        chunk.relationships.child_chunk_ids.clear();
    }

    for i in 0..chunks.len() {
        let level = chunks[i].relationships.hierarchy_level;
        if level == 0 {
            continue;
        }
        let Some(parent) = (0..i)
            .rev()
            .find(|&j| chunks[j].relationships.hierarchy_level < level)
        else {
            continue;
        };
        let child_id = chunks[i].id.clone();
        chunks[i].relationships.parent_chunk_id = Some(chunks[parent].id.clone());
        chunks[parent].relationships.child_chunk_ids.push(child_id);
    }
}

pub fn build_graph(chunks: &[Chunk]) -> ChunkGraph {
    let mut graph = ChunkGraph {
        nodes: chunks.iter().map(|c| c.id.clone()).collect(),
        ..ChunkGraph::default()
    };
    let known: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();

    for chunk in chunks {
        let rel = &chunk.relationships;
        let edges = graph.edges.entry(chunk.id.clone()).or_default();

        if let Some(next) = rel.next_chunk_id.as_deref().filter(|id| known.contains(id)) {
            edges.insert(next.to_string());
        }
        for child in rel.child_chunk_ids.iter().filter(|id| known.contains(id.as_str())) {
            edges.insert(child.clone());
        }

        if rel.previous_chunk_id.is_none() && rel.parent_chunk_id.is_none() {
            graph.roots.insert(chunk.id.clone());
        }
        if rel.next_chunk_id.is_none() && rel.child_chunk_ids.is_empty() {
            graph.leaves.insert(chunk.id.clone());
        }
    }

    graph
}

pub fn build_hierarchy(chunks: &[Chunk]) -> ChunkHierarchy {
    let mut hierarchy = ChunkHierarchy::default();

    for chunk in chunks {
        hierarchy
            .levels
            .entry(chunk.relationships.hierarchy_level)
            .or_default()
            .push(chunk.id.clone());
        if !chunk.relationships.child_chunk_ids.is_empty() {
            hierarchy
                .children
                .insert(chunk.id.clone(), chunk.relationships.child_chunk_ids.clone());
        }
    }

    for chunk in chunks {
        if let Some(parent) = &chunk.relationships.parent_chunk_id {
            hierarchy.parents.insert(chunk.id.clone(), parent.clone());
            let children = hierarchy.children.entry(parent.clone()).or_default();
            if !children.contains(&chunk.id) {
                children.push(chunk.id.clone());
            }
        }
    }

    for (child, parent) in &hierarchy.parents {
        let siblings = hierarchy
            .children
            .get(parent)
            .map(|ids| ids.iter().filter(|id| *id != child).cloned().collect())
            .unwrap_or_default();
        hierarchy.siblings.insert(child.clone(), siblings);
    }

    hierarchy
}

/// Check every relationship invariant. Reports all problems found.
pub fn validate(chunks: &[Chunk]) -> ValidationReport {
    let index = index_of(chunks);
    let mut errors = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        let rel = &chunk.relationships;
        let links = [
            (LinkKind::Previous, rel.previous_chunk_id.as_deref()),
            (LinkKind::Next, rel.next_chunk_id.as_deref()),
            (LinkKind::Parent, rel.parent_chunk_id.as_deref()),
        ]
        .into_iter()
        .chain(rel.child_chunk_ids.iter().map(|c| (LinkKind::Child, Some(c.as_str()))));

        for (link, target) in links {
            let Some(target) = target else { continue };
            if target == chunk.id {
                errors.push(RelationshipError::SelfReference {
                    chunk_id: chunk.id.clone(),
                    link,
                });
            } else if !index.contains_key(target) {
                errors.push(RelationshipError::Dangling {
                    chunk_id: chunk.id.clone(),
                    link,
                    target: target.to_string(),
                });
            }
        }

        if let Some(&n) = rel.next_chunk_id.as_deref().and_then(|id| index.get(id)) {
            if chunks[n].relationships.previous_chunk_id.as_deref() != Some(chunk.id.as_str()) {
                errors.push(RelationshipError::AsymmetricSequence {
                    chunk_id: chunk.id.clone(),
                    other_id: chunks[n].id.clone(),
                });
            }
        }
        if let Some(&p) = rel.previous_chunk_id.as_deref().and_then(|id| index.get(id)) {
            if chunks[p].relationships.next_chunk_id.as_deref() != Some(chunk.id.as_str()) {
                errors.push(RelationshipError::AsymmetricSequence {
                    chunk_id: chunk.id.clone(),
                    other_id: chunks[p].id.clone(),
                });
            }
        }

        if let Some(&p) = rel.parent_chunk_id.as_deref().and_then(|id| index.get(id)) {
            let parent = &chunks[p];
            if p >= i || parent.relationships.hierarchy_level >= rel.hierarchy_level {
                errors.push(RelationshipError::ParentOrder {
                    chunk_id: chunk.id.clone(),
                    parent_id: parent.id.clone(),
                    level: rel.hierarchy_level,
                    parent_level: parent.relationships.hierarchy_level,
                });
            }
            if !parent.relationships.child_chunk_ids.contains(&chunk.id) {
                errors.push(RelationshipError::ChildMismatch {
                    parent_id: parent.id.clone(),
                    child_id: chunk.id.clone(),
                });
            }
        }

        for child in &rel.child_chunk_ids {
            if let Some(&c) = index.get(child.as_str()) {
                if chunks[c].relationships.parent_chunk_id.as_deref() != Some(chunk.id.as_str()) {
                    errors.push(RelationshipError::ChildMismatch {
                        parent_id: chunk.id.clone(),
                        child_id: child.clone(),
                    });
                }
            }
        }
    }

    ValidationReport { errors }
}

/// Repair links in place and return a log of every change.
///
/// Order: drop dangling and self references, restore prev/next symmetry
/// (on conflict the neighbour closest by index wins), drop parents that are
/// not earlier and shallower, rebuild child lists from parent links.
/// Chunks are never removed.
pub fn repair(chunks: &mut [Chunk]) -> Vec<String> {
    let mut log = Vec::new();
    let index: HashMap<String, usize> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    let resolve = |id: &Option<String>| id.as_deref().and_then(|id| index.get(id).copied());

    for (i, chunk) in chunks.iter_mut().enumerate() {
        let id = chunk.id.clone();
        let rel = &mut chunk.relationships;
        for (link, slot) in [
            (LinkKind::Previous, &mut rel.previous_chunk_id),
            (LinkKind::Next, &mut rel.next_chunk_id),
            (LinkKind::Parent, &mut rel.parent_chunk_id),
        ] {
            let broken = match slot.as_deref() {
                Some(target) => index.get(target).is_none_or(|&t| t == i),
                None => false,
            };
            if broken {
                log.push(format!("Removed invalid {} reference from {}", link, id));
                *slot = None;
            }
        }
    }

    // next -> previous
    for a in 0..chunks.len() {
        let Some(b) = resolve(&chunks[a].relationships.next_chunk_id) else { continue };
        match resolve(&chunks[b].relationships.previous_chunk_id) {
            Some(c) if c == a => {}
            Some(c) => {
                let (winner, loser) = closer(b, a, c);
                chunks[b].relationships.previous_chunk_id = Some(chunks[winner].id.clone());
                if chunks[loser].relationships.next_chunk_id.as_deref() == Some(chunks[b].id.as_str()) {
                    chunks[loser].relationships.next_chunk_id = None;
                }
                log.push(format!(
                    "Resolved conflicting previous link of {} in favour of {}",
                    chunks[b].id, chunks[winner].id
                ));
            }
            None => {
                chunks[b].relationships.previous_chunk_id = Some(chunks[a].id.clone());
                log.push(format!("Fixed back reference from {} to {}", chunks[b].id, chunks[a].id));
            }
        }
    }

    // previous -> next
    for b in 0..chunks.len() {
        let Some(a) = resolve(&chunks[b].relationships.previous_chunk_id) else { continue };
        match resolve(&chunks[a].relationships.next_chunk_id) {
            Some(d) if d == b => {}
            Some(d) => {
                let (winner, loser) = closer(a, b, d);
                chunks[a].relationships.next_chunk_id = Some(chunks[winner].id.clone());
                if chunks[loser].relationships.previous_chunk_id.as_deref() == Some(chunks[a].id.as_str()) {
                    chunks[loser].relationships.previous_chunk_id = None;
                }
                log.push(format!(
                    "Resolved conflicting next link of {} in favour of {}",
                    chunks[a].id, chunks[winner].id
                ));
            }
            None => {
                chunks[a].relationships.next_chunk_id = Some(chunks[b].id.clone());
                log.push(format!("Fixed forward reference from {} to {}", chunks[a].id, chunks[b].id));
            }
        }
    }

    for i in 0..chunks.len() {
        let Some(p) = resolve(&chunks[i].relationships.parent_chunk_id) else { continue };
        let level = chunks[i].relationships.hierarchy_level;
        if p >= i || chunks[p].relationships.hierarchy_level >= level {
            log.push(format!(
                "Removed parent {} from {}: parent must be earlier and at a lower level",
                chunks[p].id, chunks[i].id
            ));
            chunks[i].relationships.parent_chunk_id = None;
        }
    }

    let mut children: Vec<Vec<String>> = vec![Vec::new(); chunks.len()];
    for chunk in chunks.iter() {
        if let Some(p) = resolve(&chunk.relationships.parent_chunk_id) {
            children[p].push(chunk.id.clone());
        }
    }
    for (chunk, rebuilt) in chunks.iter_mut().zip(children) {
        if chunk.relationships.child_chunk_ids != rebuilt {
            log.push(format!("Rebuilt child list of {}", chunk.id));
            chunk.relationships.child_chunk_ids = rebuilt;
        }
    }

    if !log.is_empty() {
        tracing::info!(repairs = log.len(), "Repaired chunk relationships");
    }
    log
}

/// Of `x` and `y`, the index closest to `anchor`, then the other one.
fn closer(anchor: usize, x: usize, y: usize) -> (usize, usize) {
    if anchor.abs_diff(x) <= anchor.abs_diff(y) {
        (x, y)
    } else {
        (y, x)
    }
}

/// Deduplicate child lists and order them by level, then index.
pub fn optimize(chunks: &mut [Chunk]) -> Vec<String> {
    let mut log = Vec::new();
    let order: HashMap<String, (u32, usize)> = chunks
        .iter()
        .map(|c| (c.id.clone(), (c.relationships.hierarchy_level, c.metadata.chunk_index)))
        .collect();

    for chunk in chunks.iter_mut() {
        let children = &mut chunk.relationships.child_chunk_ids;
        let before = children.len();
        let mut seen = HashSet::new();
        children.retain(|id| seen.insert(id.clone()));
        if children.len() < before {
            log.push(format!("Removed duplicate child references from {}", chunk.id));
        }
        children.sort_by_key(|id| order.get(id).copied().unwrap_or((u32::MAX, usize::MAX)));
    }

    log
}

pub fn statistics(chunks: &[Chunk]) -> RelationshipStats {
    let graph = build_graph(chunks);
    let hierarchy = build_hierarchy(chunks);
    let total_children: usize = chunks.iter().map(|c| c.relationships.child_chunk_ids.len()).sum();

    RelationshipStats {
        total_chunks: chunks.len(),
        hierarchy_levels: hierarchy.levels.len(),
        max_depth: hierarchy.levels.keys().next_back().copied().unwrap_or(0),
        avg_children_per_chunk: if chunks.is_empty() {
            0.0
        } else {
            total_children as f64 / chunks.len() as f64
        },
        root_chunks: graph.roots.len(),
        leaf_chunks: graph.leaves.len(),
        orphaned_chunks: chunks
            .iter()
            .filter(|c| {
                let rel = &c.relationships;
                rel.parent_chunk_id.is_none()
                    && rel.previous_chunk_id.is_none()
                    && rel.next_chunk_id.is_none()
                    && rel.child_chunk_ids.is_empty()
            })
            .count(),
    }
}

/// The whole prev/next chain containing `start_id`, from its first chunk.
pub fn sequence_from<'a>(chunks: &'a [Chunk], start_id: &str) -> Vec<&'a Chunk> {
    let index = index_of(chunks);
    let Some(&start) = index.get(start_id) else {
        return Vec::new();
    };

    let mut visited = HashSet::from([start]);
    let mut first = start;
    while let Some(&prev) = chunks[first]
        .relationships
        .previous_chunk_id
        .as_deref()
        .and_then(|id| index.get(id))
    {
        if !visited.insert(prev) {
            break;
        }
        first = prev;
    }

    let mut sequence = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(first);
    while let Some(i) = current {
        if !seen.insert(i) {
            break;
        }
        sequence.push(&chunks[i]);
        current = chunks[i]
            .relationships
            .next_chunk_id
            .as_deref()
            .and_then(|id| index.get(id).copied());
    }
    sequence
}

/// All chunks below `id` in the hierarchy, depth first.
pub fn descendants<'a>(chunks: &'a [Chunk], id: &str) -> Vec<&'a Chunk> {
    let index = index_of(chunks);
    let mut found = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![id];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(&i) = index.get(current) else { continue };
        if current != id {
            found.push(&chunks[i]);
        }
        for child in chunks[i].relationships.child_chunk_ids.iter().rev() {
            if !visited.contains(child.as_str()) {
                stack.push(child.as_str());
            }
        }
    }
    found
}

/// Parents of `id` from the root down.
pub fn ancestors<'a>(chunks: &'a [Chunk], id: &str) -> Vec<&'a Chunk> {
    let index = index_of(chunks);
    let mut found = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut current = index.get(id).copied();

    while let Some(i) = current {
        visited.insert(i);
        current = chunks[i]
            .relationships
            .parent_chunk_id
            .as_deref()
            .and_then(|p| index.get(p).copied())
            .filter(|p| !visited.contains(p));
        if let Some(p) = current {
            found.push(&chunks[p]);
        }
    }

    found.reverse();
    found
}

pub fn chunks_at_level(chunks: &[Chunk], level: u32) -> Vec<&Chunk> {
    chunks
        .iter()
        .filter(|c| c.relationships.hierarchy_level == level)
        .collect()
}

/// Other chunks sharing the parent of `id`. Root chunks have no siblings.
pub fn siblings<'a>(chunks: &'a [Chunk], id: &str) -> Vec<&'a Chunk> {
    let Some(parent) = chunks
        .iter()
        .find(|c| c.id == id)
        .and_then(|c| c.relationships.parent_chunk_id.as_deref())
    else {
        return Vec::new();
    };

    chunks
        .iter()
        .filter(|c| c.id != id && c.relationships.parent_chunk_id.as_deref() == Some(parent))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::chunk_at_level;

    fn sample() -> Vec<Chunk> {
        // levels: 0, 1, 2, 1, 0
        let mut chunks: Vec<Chunk> = [0, 1, 2, 1, 0]
            .iter()
            .enumerate()
            .map(|(i, level)| chunk_at_level("doc", i, *level))
            .collect();
        link_sequence(&mut chunks);
        assign_hierarchy(&mut chunks);
        chunks
    }

    #[test]
    fn test_sequence_links() {
        let chunks = sample();
        assert!(chunks[0].relationships.previous_chunk_id.is_none());
        assert_eq!(chunks[0].relationships.next_chunk_id.as_deref(), Some("doc_chunk_1"));
        assert_eq!(chunks[4].relationships.previous_chunk_id.as_deref(), Some("doc_chunk_3"));
        assert!(chunks[4].relationships.next_chunk_id.is_none());
    }

    #[test]
    fn test_hierarchy_assignment() {
        let chunks = sample();
        assert_eq!(chunks[1].relationships.parent_chunk_id.as_deref(), Some("doc_chunk_0"));
        assert_eq!(chunks[2].relationships.parent_chunk_id.as_deref(), Some("doc_chunk_1"));
        assert_eq!(chunks[3].relationships.parent_chunk_id.as_deref(), Some("doc_chunk_0"));
        assert!(chunks[4].relationships.parent_chunk_id.is_none());
        assert_eq!(
            chunks[0].relationships.child_chunk_ids,
            vec!["doc_chunk_1", "doc_chunk_3"]
        );
        assert!(validate(&chunks).is_valid());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut chunks = sample();
        chunks[1].relationships.next_chunk_id = Some("missing".to_string());
        chunks[3].relationships.parent_chunk_id = Some("doc_chunk_4".to_string());

        let report = validate(&chunks);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| matches!(
            e,
            RelationshipError::Dangling { link: LinkKind::Next, .. }
        )));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, RelationshipError::AsymmetricSequence { .. })));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, RelationshipError::ParentOrder { .. })));
        assert!(report
            .messages()
            .iter()
            .any(|m| m.contains("non-existent next chunk missing")));
    }

    #[test]
    fn test_repair_restores_integrity() {
        let mut chunks = sample();
        chunks[1].relationships.next_chunk_id = Some("missing".to_string());
        chunks[2].relationships.previous_chunk_id = None;
        chunks[3].relationships.parent_chunk_id = Some("doc_chunk_4".to_string());
        chunks[0].relationships.child_chunk_ids.push("doc_chunk_2".to_string());

        let log = repair(&mut chunks);
        assert!(!log.is_empty());
        assert_eq!(chunks.len(), 5);

        let report = validate(&chunks);
        assert!(report.is_valid(), "still invalid: {:?}", report.messages());
        assert!(chunks[3].relationships.parent_chunk_id.is_none());
    }

    #[test]
    fn test_repair_is_noop_on_valid_input() {
        let mut chunks = sample();
        let before = chunks.clone();
        assert!(repair(&mut chunks).is_empty());
        assert_eq!(chunks, before);
    }

    #[test]
    fn test_optimize_dedupes_and_orders() {
        let mut chunks = sample();
        chunks[0].relationships.child_chunk_ids =
            vec!["doc_chunk_3".into(), "doc_chunk_1".into(), "doc_chunk_3".into()];
        let log = optimize(&mut chunks);
        assert_eq!(log.len(), 1);
        assert_eq!(
            chunks[0].relationships.child_chunk_ids,
            vec!["doc_chunk_1", "doc_chunk_3"]
        );
    }

    #[test]
    fn test_traversal_helpers() {
        let chunks = sample();
        let ids = |v: Vec<&Chunk>| v.iter().map(|c| c.id.clone()).collect::<Vec<_>>();

        assert_eq!(sequence_from(&chunks, "doc_chunk_2").len(), 5);
        assert_eq!(
            ids(descendants(&chunks, "doc_chunk_0")),
            vec!["doc_chunk_1", "doc_chunk_2", "doc_chunk_3"]
        );
        assert_eq!(ids(ancestors(&chunks, "doc_chunk_2")), vec!["doc_chunk_0", "doc_chunk_1"]);
        assert_eq!(chunks_at_level(&chunks, 1).len(), 2);
        assert_eq!(ids(siblings(&chunks, "doc_chunk_1")), vec!["doc_chunk_3"]);
        assert!(siblings(&chunks, "doc_chunk_0").is_empty());
    }

    #[test]
    fn test_walks_survive_cycles() {
        let mut chunks = sample();
        chunks[0].relationships.parent_chunk_id = Some("doc_chunk_2".to_string());
        chunks[2].relationships.child_chunk_ids.push("doc_chunk_0".to_string());

        assert_eq!(ancestors(&chunks, "doc_chunk_2").len(), 2);
        assert_eq!(descendants(&chunks, "doc_chunk_0").len(), 3);
    }

    #[test]
    fn test_statistics_and_views() {
        let chunks = sample();
        let stats = statistics(&chunks);
        assert_eq!(stats.total_chunks, 5);
        assert_eq!(stats.hierarchy_levels, 3);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.root_chunks, 1);
        assert_eq!(stats.orphaned_chunks, 0);
        assert!((stats.avg_children_per_chunk - 0.6).abs() < 1e-9);

        let graph = build_graph(&chunks);
        assert_eq!(graph.nodes.len(), 5);
        assert!(graph.edges["doc_chunk_0"].contains("doc_chunk_3"));

        let hierarchy = build_hierarchy(&chunks);
        assert_eq!(hierarchy.levels[&1], vec!["doc_chunk_1", "doc_chunk_3"]);
        assert_eq!(hierarchy.siblings["doc_chunk_3"], vec!["doc_chunk_1"]);
    }
}
