//! Repair of UTF-8 text that was decoded as Windows-1252 / Latin-1.

/// Mis-decoded sequence and its intended text. Longer sequences come first.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "\u{2019}"),
    ("â€˜", "\u{2018}"),
    ("â€œ", "\u{201C}"),
    ("â€\u{9D}", "\u{201D}"),
    ("â€“", "\u{2013}"),
    ("â€”", "\u{2014}"),
    ("â€¦", "\u{2026}"),
    ("â€¢", "\u{2022}"),
    ("â‚¬", "\u{20AC}"),
    ("â„¢", "\u{2122}"),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ãª", "ê"),
    ("Ã¡", "á"),
    ("Ã\u{A0}", "à"),
    ("Ã¢", "â"),
    ("Ã£", "ã"),
    ("Ã¤", "ä"),
    ("Ã§", "ç"),
    ("Ã\u{AD}", "í"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ãµ", "õ"),
    ("Ã¶", "ö"),
    ("Ãº", "ú"),
    ("Ã¼", "ü"),
    ("Ã±", "ñ"),
    ("ÃŸ", "ß"),
    ("Ã‰", "É"),
    ("Ã‡", "Ç"),
    ("Â°", "°"),
    ("Â±", "±"),
    ("Â½", "½"),
    ("Â¼", "¼"),
    ("Â¾", "¾"),
    ("Âµ", "µ"),
    ("Â²", "²"),
    ("Â³", "³"),
    ("Â©", "©"),
    ("Â®", "®"),
    ("Â§", "§"),
    ("Â\u{A0}", "\u{A0}"),
];

/// Double-encoded text needs one pass per encoding layer.
const MAX_PASSES: usize = 3;

/// Replace known mojibake sequences until the text stops changing.
pub fn fix_encoding(text: &str) -> String {
    let mut current = text.to_string();

    for _ in 0..MAX_PASSES {
        if !has_mojibake(&current) {
            break;
        }
        let mut next = current.clone();
        for (broken, fixed) in MOJIBAKE {
            if next.contains(broken) {
                next = next.replace(broken, fixed);
            }
        }
        if next == current {
            break;
        }
        current = next;
    }

    current
}

/// Whether any known mis-decoded sequence is present.
pub fn has_mojibake(text: &str) -> bool {
    (text.contains('Ã') || text.contains('Â') || text.contains("â€") || text.contains("â‚") || text.contains("â„"))
        && MOJIBAKE.iter().any(|(broken, _)| text.contains(broken))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_sequences() {
        assert_eq!(fix_encoding("donâ€™t"), "don\u{2019}t");
        assert_eq!(fix_encoding("cafÃ©"), "café");
        assert_eq!(fix_encoding("90Â°C Â±2"), "90°C ±2");
        assert_eq!(fix_encoding("aâ€”b"), "a\u{2014}b");
    }

    #[test]
    fn test_adjacent_sequences() {
        assert_eq!(fix_encoding("Ã‡Ã£o"), "Ção");
        assert_eq!(fix_encoding("â€œquotedâ€\u{9D}"), "\u{201C}quoted\u{201D}");
    }

    #[test]
    fn test_clean_text_untouched() {
        let text = "São Paulo, ÃO is not mojibake";
        assert_eq!(fix_encoding(text), text);
        assert!(!has_mojibake(text));
    }
}
