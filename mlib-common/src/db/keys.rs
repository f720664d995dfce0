//! Case-folded lookup keys
//!
//! SQLite's `NOCASE` and `LIKE` only fold ASCII letters. Names and lyrics
//! are therefore stored next to a Unicode-lowercased `_key` column, and every
//! case-insensitive comparison runs against those keys.

/// Case-fold a value for storage in a `_key` column or for matching against one
pub fn fold_key(value: &str) -> String {
    value.to_lowercase()
}
