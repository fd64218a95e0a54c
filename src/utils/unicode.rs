//! Unicode-safe helpers for working with UTF-8 strings.

use unicode_width::UnicodeWidthStr;

/// Convert a character index (0-based) to a byte index in the given string.
/// If `n` exceeds the number of characters, returns `s.len()`.
pub fn char_to_byte_index(s: &str, n: usize) -> usize {
    match s.char_indices().nth(n) {
        Some((i, _)) => i,
        None => s.len(),
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Terminal columns taken by the first `n` characters of `s`.
pub fn display_width_to(s: &str, n: usize) -> usize {
    UnicodeWidthStr::width(&s[..char_to_byte_index(s, n)])
}
