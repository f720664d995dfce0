//! Verse pagination over stored lyrics
//!
//! Verses are separated by a blank line. Lyrics imported from the metadata
//! provider sometimes carry the line breaks escaped (`\n` as two
//! characters); those are treated as real line breaks.

use mlib_common::PageRequest;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerseError {
    #[error("Page {page} is out of range ({verses} verses, {limit} per page)")]
    PageOutOfRange { page: i64, limit: i64, verses: usize },
}

/// Split lyrics into verses
///
/// Blank-only segments are dropped, so padding between verses does not
/// produce empty verses.
pub fn split_verses(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace("\\n", "\n");

    normalized
        .split("\n\n")
        .map(|verse| verse.trim_matches('\n'))
        .filter(|verse| !verse.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Return one page of verses
///
/// A page starting past the last verse is an error. The one exception is the
/// first page of lyrics with no verses at all, which is an empty page.
pub fn paginate_verses(text: Option<&str>, page: PageRequest) -> Result<Vec<String>, VerseError> {
    let verses = text.map(split_verses).unwrap_or_default();
    debug!(total = verses.len(), page = page.page, limit = page.limit, "Paginating verses");

    if verses.is_empty() && page.page == 1 {
        return Ok(Vec::new());
    }

    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    if start >= verses.len() {
        warn!(page = page.page, verses = verses.len(), "Verse page out of range");
        return Err(VerseError::PageOutOfRange {
            page: page.page,
            limit: page.limit,
            verses: verses.len(),
        });
    }

    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    Ok(verses.into_iter().skip(start).take(limit).collect())
}
