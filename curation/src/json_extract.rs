//! Extraction of JSON from free-form LLM output.
//!
//! Chat models wrap structured replies in markdown code fences or surround
//! them with prose. Every call site that expects JSON goes through these two
//! functions rather than hand-rolling its own stripping.

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````)
/// from `text`. Text without a leading fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "python", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match rest.rfind("```") {
        Some(idx) => rest[..idx].trim(),
        None => rest.trim(),
    }
}

/// Extract the first balanced top-level JSON array from `text`.
///
/// Bracket matching is string-aware, so `]` inside a quoted value does not
/// close the array. Returns `None` when no balanced array exists.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let text = strip_code_fences(text);
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
