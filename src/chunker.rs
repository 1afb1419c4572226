//! Overlapping sliding-window text chunker.
//!
//! Splits a corpus section into ordered chunks no longer than the configured
//! size, where each chunk overlaps its predecessor by the configured amount.
//! Split points prefer natural separators — paragraph break, sentence end,
//! line break, word break — before falling back to a hard character cut, so
//! chunks keep some semantic coherence for embedding.
//!
//! Deterministic: the same text and configuration always yield the same
//! chunk sequence. The only error condition is an invalid configuration
//! (`size == 0` or `overlap >= size`), rejected at construction.
//!
//! # Example
//!
//! ```rust
//! use docent::chunker::Chunker;
//!
//! let chunker = Chunker::new(1000, 100).unwrap();
//! let chunks = chunker.split("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! ```

use crate::error::{DocentError, Result};

/// Natural split points tried in order before a hard cut.
const SEPARATORS: [&str; 4] = ["\n\n", ". ", "\n", " "];

/// Sliding-window chunker with bounded size and bounded overlap.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    /// Rejects `chunk_size == 0` and `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocentError::InvalidChunkerConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(DocentError::InvalidChunkerConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split one section's text into overlapping chunks.
    ///
    /// Guarantees:
    /// - No chunk exceeds `chunk_size` bytes.
    /// - Consecutive chunks overlap by `chunk_overlap` bytes (shrunk only to
    ///   land on a UTF-8 character boundary).
    /// - Concatenating the first chunk with the non-overlap tail of each
    ///   following chunk reconstructs the input exactly.
    /// - Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < text.len() {
            let mut hard_end =
                snap_to_char_boundary(text, (start + self.chunk_size).min(text.len()));
            if hard_end <= start {
                // A multi-byte character wider than the window; take it whole.
                hard_end = snap_forward_to_char_boundary(text, start + 1);
            }
            let end = if hard_end < text.len() {
                self.natural_end(text, start, hard_end)
            } else {
                hard_end
            };

            chunks.push(text[start..end].to_string());

            if end >= text.len() {
                break;
            }
            // Back up by the overlap so the next chunk repeats the tail of
            // this one. Snapping only ever moves the start forward, shrinking
            // the overlap, never the other way.
            start = snap_forward_to_char_boundary(text, end - self.chunk_overlap.min(end - start - 1));
        }

        chunks
    }

    /// Pick the end of the chunk starting at `start`, preferring the latest
    /// natural separator inside the window. A separator is only accepted if
    /// it leaves the chunk longer than the overlap (otherwise the window
    /// could stop advancing) and longer than half the target size (so
    /// boundary adjustment never degenerates into slivers).
    fn natural_end(&self, text: &str, start: usize, hard_end: usize) -> usize {
        let window = &text[start..hard_end];
        let min_len = (self.chunk_size / 2).max(self.chunk_overlap + 1);

        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                let cut = pos + sep.len();
                if cut > min_len {
                    return start + cut;
                }
            }
        }

        hard_end
    }
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Snap a byte index forward to the nearest valid UTF-8 char boundary.
fn snap_forward_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
