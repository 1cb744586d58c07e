//! Token estimation.
//!
//! The default estimator is a cheap proxy for an embedding-model tokenizer:
//! whitespace-separated words plus punctuation marks plus numeric tokens.
//! Implement [`TokenEstimator`] to plug in a real tokenizer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid numeric token regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBreakdown {
    pub text: usize,
    pub whitespace: usize,
    pub punctuation: usize,
    pub numbers: usize,
    pub total: usize,
}

pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> TokenBreakdown;

    fn count(&self, text: &str) -> usize {
        self.estimate(text).total
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> TokenBreakdown {
        let words = text.split_whitespace().count();
        let whitespace = text.chars().filter(|c| c.is_whitespace()).count();
        let punctuation = text.chars().filter(|c| is_punctuation(*c)).count();
        let numbers = NUMERIC.find_iter(text).count();

        TokenBreakdown {
            text: words,
            whitespace,
            punctuation,
            numbers,
            total: words + punctuation + numbers,
        }
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '…' | '–' | '—' | '«' | '»' | '¿' | '¡' | '°' | '±')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown() {
        let b = HeuristicEstimator.estimate("Torque to 50 Nm, then stop.");
        assert_eq!(b.text, 6);
        assert_eq!(b.punctuation, 2);
        assert_eq!(b.numbers, 1);
        assert_eq!(b.whitespace, 5);
        assert_eq!(b.total, 9);
    }

    #[test]
    fn test_empty() {
        assert_eq!(HeuristicEstimator.count(""), 0);
        assert_eq!(HeuristicEstimator.count("   \n"), 0);
    }

    #[test]
    fn test_custom_estimator() {
        struct Chars;
        impl TokenEstimator for Chars {
            fn estimate(&self, text: &str) -> TokenBreakdown {
                let n = text.chars().count();
                TokenBreakdown {
                    text: n,
                    total: n,
                    ..TokenBreakdown::default()
                }
            }
        }
        assert_eq!(Chars.count("abcd"), 4);
    }
}
