// ============================================================================
// Text Normalization
// ============================================================================

/// Collapse runs of whitespace to a single space, trim, lowercase.
///
/// Used for fuzzy comparison everywhere citation text is matched against live
/// document text, so that reflow and case drift do not break equality.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_whitespace = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            in_whitespace = false;
        }
    }
    out
}

/// First `n` characters of a string, char-indexed.
pub fn char_prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
