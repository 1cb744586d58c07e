//! Content statistics: counts, readability and term frequency.

use super::types::ContentStats;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence split regex"));

static PARAGRAPH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("valid paragraph split regex"));

static TECHNICAL_TERMS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b\d+\s*(?:mm|cm|m|in|ft|kg|lb|°C|°F|V|A|W|Hz|RPM|PSI)\b")
            .expect("valid unit term regex"),
        Regex::new(r"\b[A-Z]{2,}(?:-\d+)?\b").expect("valid acronym regex"),
        Regex::new(r"(?i)\b(?:torque|pressure|voltage|current|resistance|temperature|frequency)\b")
            .expect("valid technical keyword regex"),
    ]
});

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "was", "are", "were",
];

const KEY_TERM_LIMIT: usize = 10;

pub fn analyze_content(content: &str) -> ContentStats {
    let words: Vec<&str> = content.split_whitespace().collect();
    let sentence_count = SENTENCE_SPLIT
        .split(content)
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraph_count = PARAGRAPH_SPLIT
        .split(content)
        .filter(|p| !p.trim().is_empty())
        .count();

    let average_word_length = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    let unique_terms = words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<BTreeSet<_>>()
        .len();

    let technical = technical_terms(content);
    let technical_density = if words.is_empty() {
        0.0
    } else {
        (technical.len() as f64 / words.len() as f64).min(1.0)
    };

    ContentStats {
        word_count: words.len(),
        sentence_count,
        paragraph_count,
        average_word_length,
        readability_score: readability(&words, sentence_count),
        technical_density,
        unique_terms,
        key_terms: key_terms(&content.unicode_words().collect::<Vec<_>>()),
    }
}

/// Distinct units, acronyms and engineering keywords.
pub fn technical_terms(content: &str) -> BTreeSet<String> {
    TECHNICAL_TERMS
        .iter()
        .flat_map(|re| re.find_iter(content).map(|m| m.as_str().to_string()))
        .collect()
}

/// Most frequent words longer than three chars, stop words excluded.
/// `words` are punctuation-free word segments.
/// Ties keep first-seen order.
fn key_terms(words: &[&str]) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if word.chars().count() <= 3 || STOP_WORDS.contains(&lower.as_str()) {
            continue;
        }
        counts.entry(lower).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .take(KEY_TERM_LIMIT)
        .map(|(word, _)| word)
        .collect()
}

/// Flesch reading ease, clamped to 0..=100.
fn readability(words: &[&str], sentence_count: usize) -> f64 {
    if words.is_empty() || sentence_count == 0 {
        return 0.0;
    }
    let words_per_sentence = words.len() as f64 / sentence_count as f64;
    let syllables_per_word =
        words.iter().map(|w| count_syllables(w)).sum::<usize>() as f64 / words.len() as f64;

    (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0)
}

/// Vowel groups, minus a silent trailing `e`, at least one.
fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count: usize = 0;
    let mut previous_vowel = false;
    for c in lower.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }
    if lower.ends_with('e') {
        count = count.saturating_sub(1);
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let stats = analyze_content("Check the valve. Replace the seal!\n\nRun the pump for ten minutes.");
        assert_eq!(stats.word_count, 12);
        assert_eq!(stats.sentence_count, 3);
        assert_eq!(stats.paragraph_count, 2);
        assert!(stats.readability_score > 0.0 && stats.readability_score <= 100.0);
    }

    #[test]
    fn test_empty_content() {
        let stats = analyze_content("");
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.readability_score, 0.0);
        assert_eq!(stats.technical_density, 0.0);
        assert!(stats.key_terms.is_empty());
    }

    #[test]
    fn test_key_terms_by_frequency() {
        let stats = analyze_content("pump valve pump seal pump valve with the and");
        assert_eq!(stats.key_terms, vec!["pump", "valve", "seal"]);
        assert_eq!(stats.unique_terms, 6);

        let stats = analyze_content("Pump, pump. Valve! (valve) pump");
        assert_eq!(stats.key_terms, vec!["pump", "valve"]);
    }

    #[test]
    fn test_technical_density() {
        let stats = analyze_content("Apply 50 Nm torque at 24 V");
        let terms = technical_terms("Apply 50 Nm torque at 24 V");
        assert!(terms.contains("torque"));
        assert!(terms.contains("24 V"));
        assert!(stats.technical_density > 0.0);
    }

    #[test]
    fn test_syllables() {
        assert_eq!(count_syllables("pump"), 1);
        assert_eq!(count_syllables("replace"), 2);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("42"), 1);
    }
}
