//! crates/voicebook_core/src/paginator.rs
//!
//! Splits a document's text into pages of at most `budget` characters.
//!
//! Characters are counted as Unicode scalar values, never bytes, so multi-byte
//! text gets the same page sizes as ASCII. A cut prefers, in order: right after
//! the last `.`, `!` or `?` in the window, then the last space in the window,
//! then after the first character so that the loop always makes progress.

/// Default maximum number of characters per page.
pub const DEFAULT_PAGE_BUDGET: usize = 250;

/// Splits `text` into trimmed, non-empty pages.
///
/// The output depends only on `text` and `budget`. Empty or all-whitespace
/// input yields no pages.
pub fn paginate(text: &str, budget: usize) -> Vec<String> {
    let mut remaining = text.trim();
    let mut pages = Vec::new();

    while !remaining.is_empty() {
        if remaining.chars().count() <= budget {
            pages.push(remaining.to_string());
            break;
        }

        let (page, rest) = remaining.split_at(cut_index(remaining, budget));
        let page = page.trim();
        if !page.is_empty() {
            pages.push(page.to_string());
        }
        remaining = rest.trim();
    }

    pages
}

/// Byte offset at which to cut `text`. Always > 0 for non-empty `text`.
fn cut_index(text: &str, budget: usize) -> usize {
    let mut sentence_end = None;
    let mut last_space = None;

    for (offset, ch) in text.char_indices().take(budget) {
        match ch {
            '.' | '!' | '?' => sentence_end = Some(offset + ch.len_utf8()),
            ' ' => last_space = Some(offset),
            _ => {}
        }
    }

    sentence_end
        .or(last_space)
        .filter(|&cut| cut > 0)
        .unwrap_or_else(|| text.chars().next().map_or(text.len(), char::len_utf8))
}
