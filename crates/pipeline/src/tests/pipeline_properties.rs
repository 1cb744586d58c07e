//! Properties that must hold for any chunking run.

use super::fixtures::{prose, single_page};
use crate::chunk::DocumentChunker;
use crate::config::ChunkConfig;
use crate::normalize::{normalize, NormalizeOptions};
use crate::relationships;
use proptest::prelude::*;

fn config(chunk_size: usize, overlap: usize) -> ChunkConfig {
    ChunkConfig {
        chunk_size,
        overlap,
        respect_sentences: true,
        respect_paragraphs: true,
        min_chunk_size: 5,
    }
}

fn assert_idempotent(sample: &str) {
    let options = NormalizeOptions::default();
    let once = normalize(sample, &options).content;
    let twice = normalize(&once, &options).content;
    assert_eq!(twice, once, "not idempotent for {:?}", sample);
}

#[test]
fn test_normalization_is_idempotent() {
    let samples = [
        "",
        "plain text",
        "  leading and trailing  \r\n\r\n\r\n\r\nlines  ",
        "\u{e2}\u{20ac}\u{153}Quoted\u{e2}\u{20ac}\u{9d} and \u{201C}curly\u{201D} quotes",
        "control\u{0007}chars\u{0000} inside",
        "e\u{0301}cole and caf\u{00e9}",
        "| A | B |\n|---|---|\n| 1 | 2 |\n\nAfter the table.",
        "```\nfn main() {}\n```\n\nText after code.",
    ];
    for sample in samples {
        assert_idempotent(sample);
    }
}

#[test]
fn test_normalization_is_idempotent_when_cleanup_changes_structure() {
    // Fence pairing shifts once a non-breaking space is gone
    assert_idempotent("\u{a0}```\n```\n ```");
    // A control character between a list and an indented block
    assert_idempotent("2. d\n\u{7}\n\n    e\n    e");
    // An em dash that becomes a list bullet
    assert_idempotent("\u{2014} d\n\n    e\n    e");

    let options = NormalizeOptions::default();
    assert_eq!(normalize("2. d\n\u{7}\n\n    e\n    e", &options).content, "2. d\n\ne\ne");
}

fn structured_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("| Part | Torque |".to_string()),
        Just("|------|--------|".to_string()),
        Just("| M8   | 25 Nm  |".to_string()),
        Just("+------+--------+".to_string()),
        Just("```".to_string()),
        Just("```rust".to_string()),
        Just("~~~".to_string()),
        Just("\u{a0}```".to_string()),
        Just("    ```".to_string()),
        Just("    let torque = 25;".to_string()),
        Just("\tcall(pump);".to_string()),
        Just("- check the seal".to_string()),
        Just("2. open the valve".to_string()),
        Just("\u{2014} dash led line".to_string()),
        Just("  * nested bullet".to_string()),
        Just("Note: keep dry".to_string()),
        Just("P = V * I".to_string()),
        Just("Figure 3 - Pump assembly".to_string()),
        Just("# Maintenance".to_string()),
        Just("\u{201C}Quoted\u{201D} warning text.".to_string()),
        Just("\u{e2}\u{20ac}\u{153}broken\u{e2}\u{20ac}\u{9d}".to_string()),
        Just("\u{7}".to_string()),
        Just("\u{a0}".to_string()),
        Just("\u{E000}0\u{E001}".to_string()),
        Just(String::new()),
        "[a-z0-9 .|\t\u{a0}\u{2013}\u{7}-]{0,16}",
    ]
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\n\n"), Just("\n\n\n\n"), Just("\r\n"), Just(" ")]
}

fn mixed_text() -> impl Strategy<Value = String> {
    prop::collection::vec((structured_line(), separator()), 0..16).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(line, sep)| format!("{line}{sep}"))
            .collect::<String>()
    })
}

#[test]
fn test_normalization_is_idempotent_for_generated_text() {
    let options = NormalizeOptions::default();
    proptest!(|(text in mixed_text())| {
        let once = normalize(&text, &options).content;
        let twice = normalize(&once, &options).content;
        prop_assert_eq!(twice, once);
    });
}

#[test]
fn test_normalization_is_idempotent_for_arbitrary_text() {
    let options = NormalizeOptions::default();
    proptest!(|(text in "\\PC{0,200}")| {
        let once = normalize(&text, &options).content;
        let twice = normalize(&once, &options).content;
        prop_assert_eq!(twice, once);
    });
}

#[test]
fn test_chunks_cover_text_without_gaps() {
    let input = single_page("doc", prose(8));
    let chunks = DocumentChunker::new(config(200, 40)).chunk(&input);
    assert!(chunks.len() > 2);

    assert_eq!(chunks[0].metadata.byte_range.start, 0);
    for pair in chunks.windows(2) {
        let (previous, next) = (&pair[0].metadata.byte_range, &pair[1].metadata.byte_range);
        assert!(next.start <= previous.end, "gap between {:?} and {:?}", previous, next);
        assert!(next.start > previous.start);
    }
    let last = chunks.last().map(|c| c.content.as_str()).unwrap_or_default();
    assert!(last.ends_with("Paragraph 7 sentence 3 describes the pump housing in detail."));
}

#[test]
fn test_chunk_size_bound() {
    let chunk_size = 150;
    let overlap = 30;
    let input = single_page("doc", prose(10));
    let chunks = DocumentChunker::new(config(chunk_size, overlap)).chunk(&input);

    for chunk in chunks.iter().filter(|c| !c.metadata.kept_together) {
        assert!(
            chunk.char_count() <= chunk_size + overlap + 32,
            "chunk {} has {} chars",
            chunk.id,
            chunk.char_count()
        );
    }
}

#[test]
fn test_relationships_valid_after_run_and_repairable() {
    let input = single_page("doc", format!("# Overview\n{}\n\n## Detail\n{}", prose(3), prose(3)));
    let mut chunks = DocumentChunker::new(config(150, 20)).chunk(&input);
    assert!(chunks.len() > 2);
    assert!(relationships::validate(&chunks).is_valid());

    chunks[1].relationships.previous_chunk_id = Some("missing".to_string());
    assert!(!relationships::validate(&chunks).is_valid());

    let log = relationships::repair(&mut chunks);
    assert!(!log.is_empty());
    assert!(relationships::validate(&chunks).is_valid());
    assert_eq!(
        chunks[1].relationships.previous_chunk_id.as_deref(),
        Some(chunks[0].id.as_str())
    );
}

#[test]
fn test_boundary_prefers_paragraph_break() {
    let first = "The inlet valve must be inspected before every start. Replace worn seals immediately.";
    let second = "The outlet side is checked weekly. Clean the strainer when pressure drops.";
    let input = single_page("doc", format!("{}\n\n{}", first, second));
    let chunks = DocumentChunker::new(config(first.len() + 20, 0)).chunk(&input);

    assert!(chunks.len() >= 2);
    assert_eq!(chunks[0].content, first);
}

#[test]
fn test_table_is_atomic() {
    let mut prefix = "word ".repeat(20);
    prefix.truncate(97);
    prefix.push_str(".\n\n");
    let rows: String = (0..8).map(|i| format!("| r{} | 1{} |\n", i, i)).collect();
    let table = rows.trim_end();
    let text = format!("{}{}\n\nClosing text follows the table and keeps going for a while.", prefix, table);

    let table_start = prefix.len();
    let table_end = table_start + table.len();
    assert_eq!(table_start, 100);

    let chunks = DocumentChunker::new(config(60, 10)).chunk(&single_page("doc", text));
    let holders: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.byte_range.contains(&table_start))
        .collect();

    assert!(!holders.is_empty());
    for chunk in holders {
        assert!(chunk.metadata.byte_range.end >= table_end);
        assert!(chunk.content.contains("| r0 | 10 |"));
        assert!(chunk.content.contains("| r7 | 17 |"));
    }
}
