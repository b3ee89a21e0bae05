//! Phone number key handling.
//!
//! The call path may report a number with or without a leading `+` while
//! the stored key was written in the other form, so lookups try both.

/// Trim surrounding whitespace; `None` when nothing is left.
pub fn normalize_key(number: &str) -> Option<&str> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Keys to try for a lookup, exact form first, then the `+`-toggled form.
pub fn lookup_candidates(number: &str) -> Vec<String> {
    let Some(exact) = normalize_key(number) else {
        return Vec::new();
    };

    let alternate = match exact.strip_prefix('+') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        Some(_) => return vec![exact.to_string()],
        None => format!("+{exact}"),
    };

    vec![exact.to_string(), alternate]
}
