//! Character-counted truncation with visible markers.

/// Cap `text` at `cap` characters, prefixing a marker with the original length.
///
/// Empty input stays empty.
pub fn truncate_input(text: &str, cap: usize) -> String {
    let length = text.chars().count();
    if length <= cap {
        return text.to_string();
    }
    format!(
        "/* TRUNCATED: original_length={length} chars */\n{}",
        prefix(text, cap)
    )
}

/// Cap `text` at `cap` characters, appending a trailing marker when cut.
pub fn ensure_short(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    format!("{}\n/* TRUNCATED */", prefix(text, cap))
}

/// First `n` characters of `text`, never splitting a char.
pub(crate) fn prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_input_short_text_unchanged() {
        assert_eq!(truncate_input("", 10), "");
        assert_eq!(truncate_input("class A {}", 10), "class A {}");
    }

    #[test]
    fn test_truncate_input_marks_original_length() {
        let out = truncate_input("abcdefghij", 4);
        assert_eq!(out, "/* TRUNCATED: original_length=10 chars */\nabcd");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "ééééé";
        assert_eq!(truncate_input(text, 5), text);
        let out = truncate_input(text, 2);
        assert!(out.ends_with("\néé"));
        assert!(out.contains("original_length=5"));
    }

    #[test]
    fn test_ensure_short_appends_marker() {
        assert_eq!(ensure_short("abc", 3), "abc");
        assert_eq!(ensure_short("abcdef", 3), "abc\n/* TRUNCATED */");
        assert_eq!(ensure_short("", 0), "");
    }
}
