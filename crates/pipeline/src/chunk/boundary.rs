//! Boundary selection inside a cursor window.
//!
//! All positions are byte offsets into the joined text and always fall on
//! char boundaries. Window sizes are counted in chars.

use crate::analysis::SpecialContent;
use crate::config::ChunkConfig;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid paragraph break regex"));

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*(\s)"#).expect("valid sentence end regex")
});

/// Breaks in the first tenth of the window would make a sliver chunk.
const MIN_BREAK_FRACTION: usize = 10;

/// A plain word boundary is only used in the last fifth of the window.
const WORD_BREAK_FRACTION: f64 = 0.8;

/// Byte offset `chars` characters after `from`, clamped to the text end.
pub(crate) fn advance_chars(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| from + offset)
}

/// Byte offset `chars` characters before `from`, clamped to zero.
pub(crate) fn retreat_chars(text: &str, from: usize, chars: usize) -> usize {
    if chars == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(0, |(offset, _)| offset)
}

/// Pick the end of the chunk starting at `cursor`.
///
/// Preference order: end of text, paragraph break, sentence end, word
/// boundary past 80% of the window, raw window end.
pub(crate) fn find_boundary(text: &str, cursor: usize, config: &ChunkConfig) -> usize {
    let candidate_end = advance_chars(text, cursor, config.chunk_size.max(1));
    if candidate_end >= text.len() {
        return text.len();
    }

    let window = &text[cursor..candidate_end];
    let floor = window.len() / MIN_BREAK_FRACTION;

    if config.respect_paragraphs {
        if let Some(end) = PARAGRAPH_BREAK
            .find_iter(window)
            .map(|m| m.end())
            .filter(|end| *end > floor)
            .last()
        {
            return cursor + end;
        }
    }

    if config.respect_sentences {
        if let Some(end) = SENTENCE_END
            .captures_iter(window)
            .filter_map(|caps| caps.get(1).map(|ws| ws.start()))
            .filter(|end| *end > floor)
            .last()
        {
            return cursor + end;
        }
    }

    let word_floor = (window.len() as f64 * WORD_BREAK_FRACTION) as usize;
    if let Some((offset, _)) = window
        .char_indices()
        .rev()
        .find(|(offset, c)| c.is_whitespace() && *offset >= word_floor && *offset > 0)
    {
        return cursor + offset;
    }

    candidate_end
}

/// Push `boundary` past every structure that straddles it.
///
/// Tables and code blocks are never cut. Lists, diagrams and technical tokens
/// are only protected when the span is keep-together. The result never
/// shrinks and is capped at the text length.
pub(crate) fn extend_boundary(
    boundary: usize,
    text_len: usize,
    items: &[SpecialContent],
    keep_together: bool,
) -> usize {
    let mut extended = boundary;
    loop {
        let next = items
            .iter()
            .filter(|item| protects(item, keep_together))
            .map(|item| item.range())
            .filter(|r| r.start < extended && extended < r.end)
            .map(|r| r.end)
            .fold(extended, usize::max)
            .min(text_len);
        if next == extended {
            return extended;
        }
        extended = next;
    }
}

fn protects(item: &SpecialContent, keep_together: bool) -> bool {
    match item {
        SpecialContent::Table(_) | SpecialContent::Code(_) => true,
        SpecialContent::List(_) => keep_together && item.is_atomic(),
        SpecialContent::Diagram(_) | SpecialContent::Technical(_) => keep_together,
    }
}

/// Start of the next chunk: `overlap` chars back from `boundary`, moved out
/// of any protected span and forward to a word start. Never at or before
/// `cursor`.
pub(crate) fn next_cursor(
    text: &str,
    cursor: usize,
    boundary: usize,
    overlap: usize,
    protected: &[Range<usize>],
) -> usize {
    let mut next = retreat_chars(text, boundary, overlap);

    if let Some(span) = protected.iter().find(|r| r.start < next && next < r.end) {
        next = span.end.min(boundary);
    }

    next = snap_to_word_start(text, next, boundary);
    if next <= cursor {
        next = snap_to_word_start(text, boundary, boundary);
    }
    next
}

/// Move forward out of a word (not past `limit`), then over whitespace.
fn snap_to_word_start(text: &str, pos: usize, limit: usize) -> usize {
    let mut pos = pos;
    let inside_word = pos > 0
        && text[..pos].chars().next_back().is_some_and(|c| !c.is_whitespace())
        && text[pos..].chars().next().is_some_and(|c| !c.is_whitespace());

    if inside_word {
        pos = text[pos..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map_or(text.len(), |(offset, _)| pos + offset)
            .min(limit);
    }

    text[pos..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(offset, _)| pos + offset)
}
