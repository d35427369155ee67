//! Post-processing applied to every OCR result before it reaches a cue.

// ASCII punctuation replaced with its full-width form.
const CHAR_CONVERSIONS: [(char, char); 5] = [
    (',', '，'),
    (';', '；'),
    (':', '：'),
    ('!', '！'),
    ('?', '？'),
];

/// Trims surrounding whitespace, drops every U+0020 space and maps ASCII
/// punctuation to full width.
pub fn normalize_ocr_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&ch| ch != ' ')
        .map(|ch| {
            CHAR_CONVERSIONS
                .iter()
                .find(|(from, _)| *from == ch)
                .map_or(ch, |&(_, to)| to)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_punctuation_and_drops_spaces() {
        assert_eq!(normalize_ocr_text("Hello, world!"), "Hello，world！");
        assert_eq!(normalize_ocr_text("  a ; b : c ?\n"), "a；b：c？");
    }

    #[test]
    fn keeps_inner_line_breaks() {
        assert_eq!(normalize_ocr_text("\n first line \nsecond\n\n"), "firstline\nsecond");
    }

    #[test]
    fn blank_output_becomes_empty() {
        assert_eq!(normalize_ocr_text(" \n\x0c"), "");
    }
}
