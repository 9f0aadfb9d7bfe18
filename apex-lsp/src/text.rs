// Cursor arithmetic over document text. Offsets are bytes; positions are
// LSP line/character pairs with the character clamped to the line length.

/// Identifier characters: ASCII letters, digits, underscore.
pub fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Convert an LSP position to a byte offset: the lengths of all prior
/// lines plus one per newline, plus the clamped character column.
pub fn position_to_offset(text: &str, line: u32, character: u32) -> usize {
    let mut offset = 0usize;
    let mut current_line = 0u32;
    for line_text in text.split('\n') {
        if current_line == line {
            return offset + (character as usize).min(line_text.len());
        }
        offset += line_text.len() + 1;
        current_line += 1;
    }
    text.len()
}

/// The maximal identifier run containing the cursor. If the cursor sits on
/// a non-identifier character, the position one to the left is probed.
/// Returns the empty string when neither holds an identifier character.
pub fn extract_identifier(text: &str, offset: usize) -> &str {
    let bytes = text.as_bytes();
    let mut anchor = offset.min(bytes.len());
    let on_identifier = anchor < bytes.len() && is_identifier_byte(bytes[anchor]);
    if !on_identifier {
        if anchor == 0 || !is_identifier_byte(bytes[anchor - 1]) {
            return "";
        }
        anchor -= 1;
    }
    let mut start = anchor;
    while start > 0 && is_identifier_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = anchor + 1;
    while end < bytes.len() && is_identifier_byte(bytes[end]) {
        end += 1;
    }
    &text[start..end]
}

/// The identifier characters immediately left of the cursor, used as the
/// completion filter prefix.
pub fn identifier_prefix(text: &str, offset: usize) -> &str {
    let bytes = text.as_bytes();
    let end = offset.min(bytes.len());
    let mut start = end;
    while start > 0 && is_identifier_byte(bytes[start - 1]) {
        start -= 1;
    }
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_to_offset_counts_newlines() {
        let text = "ab\ncdef\ng";
        assert_eq!(position_to_offset(text, 0, 0), 0);
        assert_eq!(position_to_offset(text, 0, 2), 2);
        assert_eq!(position_to_offset(text, 1, 0), 3);
        assert_eq!(position_to_offset(text, 1, 4), 7);
        assert_eq!(position_to_offset(text, 2, 1), 9);
    }

    #[test]
    fn test_position_clamps_to_line_and_text() {
        let text = "ab\ncd";
        assert_eq!(position_to_offset(text, 0, 99), 2);
        assert_eq!(position_to_offset(text, 9, 0), text.len());
    }

    #[test]
    fn test_extract_identifier_expands_both_ways() {
        let text = "Parser token;";
        assert_eq!(extract_identifier(text, 7), "token");
        assert_eq!(extract_identifier(text, 9), "token");
        assert_eq!(extract_identifier(text, 0), "Parser");
    }

    #[test]
    fn test_extract_identifier_probes_left_of_cursor() {
        let text = "name.";
        // On the dot itself, the identifier to the left is used.
        assert_eq!(extract_identifier(text, 4), "name");
        // At end of text, same probe applies.
        assert_eq!(extract_identifier("name", 4), "name");
    }

    #[test]
    fn test_extract_identifier_empty_cases() {
        assert_eq!(extract_identifier("a + b", 2), "");
        assert_eq!(extract_identifier("", 0), "");
        assert_eq!(extract_identifier(". x", 0), "");
    }

    #[test]
    fn test_extraction_is_maximal_at_every_offset() {
        let text = "foo1 = bar_2 + x;";
        for offset in 0..=text.len() {
            let ident = extract_identifier(text, offset);
            if ident.is_empty() {
                continue;
            }
            let start = text[..offset.min(text.len())]
                .rfind(ident)
                .or_else(|| text.find(ident))
                .unwrap_or(0);
            let bytes = text.as_bytes();
            // Maximality: neither neighbor extends the identifier.
            assert!(start == 0 || !is_identifier_byte(bytes[start - 1]));
            let end = start + ident.len();
            assert!(end == bytes.len() || !is_identifier_byte(bytes[end]));
        }
    }

    #[test]
    fn test_identifier_prefix() {
        let text = "account.Na";
        assert_eq!(identifier_prefix(text, 10), "Na");
        assert_eq!(identifier_prefix(text, 8), "");
        assert_eq!(identifier_prefix(text, 7), "account");
    }
}
