// src/utils/mod.rs

//! Utility functions and helpers.

pub mod pagination;

pub use pagination::{PageSlice, paginate, paginate_capped};

/// Truncate a string to at most `max_chars` characters.
///
/// Character-based rather than byte-based so multibyte titles cannot be
/// split mid-codepoint.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
