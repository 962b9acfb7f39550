//! Structured-line extraction for verbose task replies.

use std::sync::LazyLock;

use regex::Regex;

static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*-\s*(Finding|Area|Severity|Confidence|Issue|Fix|Patch|Title|Trigger|Change|Rationale)\b",
    )
    .expect("valid regex literal")
});

static DECLARATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(public |private |protected |package |import |class |interface )")
        .expect("valid regex literal")
});

/// Keep template field lines, code-fence delimiters and declaration-looking lines.
pub fn extract_structured(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            FIELD_LINE.is_match(line)
                || trimmed.starts_with("```")
                || trimmed.ends_with("```")
                || DECLARATION_LINE.is_match(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// [`extract_structured`], unless that would discard everything.
pub fn sanitize_or_keep(text: &str) -> String {
    let kept = extract_structured(text);
    if kept.trim().is_empty() && !text.trim().is_empty() {
        text.to_string()
    } else {
        kept
    }
}
