//! Identifier normalization - the shared comparison key.
//!
//! Both call resolution keyword filtering and entity similarity compare
//! identifiers through the same canonical form: lower-cased, camel-case
//! segmented, punctuation stripped. The function is pure and total; any
//! string in, a `[a-z0-9_]` string out.

/// Canonical comparison key for an identifier.
///
/// - a separator is inserted before each upper-case letter of the input
///   (splitting `camelCase`/`PascalCase` into segments)
/// - everything is lower-cased
/// - characters outside `[a-z0-9_]` are stripped
/// - repeated separators collapse, leading/trailing separators are trimmed
///
/// The result is idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);

    for ch in identifier.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            out.push(ch);
        }
        // anything else (punctuation, whitespace, non-ascii) is stripped
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_sep = true; // true at start trims leading separators
    for ch in out.chars() {
        if ch == '_' {
            if !prev_sep {
                collapsed.push('_');
            }
            prev_sep = true;
        } else {
            collapsed.push(ch);
            prev_sep = false;
        }
    }
    if collapsed.ends_with('_') {
        collapsed.pop();
    }

    collapsed
}
