// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning literal test titles into name-filter patterns.
//!
//! Test runners such as Jest report a test's *full name* as the names of its enclosing groups
//! followed by the test's own title, and match their name filter against that full name. A
//! pattern built here therefore anchors the end of the title but not the start: a group-name
//! prefix is allowed, but a title that is only a prefix of a longer title is rejected. For
//! example, the pattern for `process order` matches `checkout process order` but not
//! `process order details`.

/// Characters that have a special meaning in a regular expression, outside of a character class.
const SPECIAL_CHARS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Escapes `text` so that it can be embedded literally in a regular expression.
///
/// Every character in `. * + ? ^ $ { } ( ) | [ ] \` is preceded by a backslash. All other
/// characters are passed through unchanged.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Returns a pattern that matches `title` at the end of a test's full name.
pub fn exact_pattern(title: &str) -> String {
    let mut pattern = escape(title);
    pattern.push('$');
    pattern
}

/// Returns a pattern that matches any of `titles` at the end of a test's full name.
///
/// * If `titles` is empty, the empty string is returned. Callers must treat that as "nothing to
///   run" rather than passing it to the runner, which would run every test.
/// * If there's a single title, its [`exact_pattern`] is returned.
/// * Otherwise, each exact pattern is wrapped in parentheses, and all of them are joined with `|`
///   in input order.
///
/// Titles are not deduplicated.
pub fn combined_pattern<I>(titles: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let patterns: Vec<_> = titles
        .into_iter()
        .map(|title| exact_pattern(title.as_ref()))
        .collect();

    match patterns.len() {
        0 => String::new(),
        1 => patterns.into_iter().next().unwrap_or_default(),
        _ => {
            let mut combined = String::new();
            for (i, pattern) in patterns.iter().enumerate() {
                if i > 0 {
                    combined.push('|');
                }
                combined.push('(');
                combined.push_str(pattern);
                combined.push(')');
            }
            combined
        }
    }
}
