//! Fixed-size character segmentation of a complete answer.
//!
//! Sizes count Unicode scalar values, so a chunk boundary never falls inside
//! a multi-byte character.

use std::iter::FusedIterator;

/// Lazy iterator over consecutive `chunk_size`-character slices of a text.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
    chunk_size: usize,
}

/// Iterate over `text` in slices of `chunk_size` characters.
///
/// The last slice holds the remainder. A `chunk_size` of zero is treated as 1.
pub fn segments(text: &str, chunk_size: usize) -> Segments<'_> {
    Segments {
        rest: text,
        chunk_size: chunk_size.max(1),
    }
}

/// Split `text` into owned chunks of `chunk_size` characters.
///
/// Empty text yields no chunks. Concatenating the result gives back `text`.
pub fn split(text: &str, chunk_size: usize) -> Vec<String> {
    segments(text, chunk_size).map(str::to_owned).collect()
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .char_indices()
            .nth(self.chunk_size)
            .map_or(self.rest.len(), |(idx, _)| idx);
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(head)
    }
}

impl FusedIterator for Segments<'_> {}
