//! Character-budget text chunking with a fixed overlap.
//!
//! Every chunk holds at most `chunk_size` characters. Chunk `i > 0` starts
//! with the last `chunk_overlap` characters of chunk `i - 1`, so dropping
//! the first `chunk_overlap` characters of every chunk but the first and
//! concatenating the rest gives back the input exactly.
//!
//! Inside a window the split point prefers the end of a line, then the end
//! of a word, and only falls back to a hard cut at the budget.

use crate::types::{AppError, Result};

/// Default budget, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 3000;
/// Default overlap, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    /// # Errors
    ///
    /// [`AppError::InvalidInput`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, including the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                chunks.push(text[offsets[start]..offsets[len]].to_string());
                break;
            }

            let end = self.split_point(&chars, start);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the end (exclusive, in chars) of the chunk starting at `start`.
    ///
    /// The end must leave more than `chunk_overlap` chars in the chunk so
    /// the next start moves forward.
    fn split_point(&self, chars: &[char], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        let min_end = start + self.chunk_overlap + 1;

        for separator in ['\n', ' '] {
            if let Some(end) = (min_end..=hard_end)
                .rev()
                .find(|&end| chars[end - 1] == separator)
            {
                return end;
            }
        }
        hard_end
    }
}
