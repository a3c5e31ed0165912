//! Separator-priority text chunker
//!
//! Text is split recursively on the first separator level that occurs in a
//! span (paragraph break, line break, sentence end, space), falling back to a
//! hard character cut. Separators stay attached to the piece they end, so the
//! pieces tile the text exactly. Adjacent pieces are merged greedily up to the
//! target size, then every chunk after the first is extended backward by the
//! overlap. Sizes and offsets are counted in chars.
//!
//! The output is a pure function of `(text, chunk_size, chunk_overlap)`, which
//! is what keeps chunk ids stable between runs.

use crate::config::ChunkingConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// One chunk of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position among the file's kept chunks, contiguous from 0
    pub index: usize,
    /// Char offset of the first char, overlap included
    pub start_char: usize,
    /// Char offset one past the last char
    pub end_char: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_overlap".to_string(),
                reason: format!(
                    "must be smaller than chunk_size ({}), got {}",
                    chunk_size, chunk_overlap
                ),
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks; whitespace-only chunks are dropped
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split(&chars, 0..chars.len(), 0, &mut pieces);

        let mut chunks = Vec::new();
        let mut previous: Option<Range<usize>> = None;
        for base in self.merge(pieces) {
            let prev = previous.replace(base.clone());
            if chars[base.clone()].iter().all(|c| c.is_whitespace()) {
                continue;
            }

            let start = match prev {
                Some(prev) => base.start - self.chunk_overlap.min(prev.len()),
                None => base.start,
            };

            chunks.push(TextChunk {
                index: chunks.len(),
                start_char: start,
                end_char: base.end,
                text: chars[start..base.end].iter().collect(),
            });
        }

        chunks
    }

    fn split(&self, chars: &[char], range: Range<usize>, level: usize, out: &mut Vec<Range<usize>>) {
        if range.len() <= self.chunk_size {
            out.push(range);
            return;
        }

        let Some(patterns) = SEPARATORS.get(level) else {
            let mut start = range.start;
            while start < range.end {
                let end = (start + self.chunk_size).min(range.end);
                out.push(start..end);
                start = end;
            }
            return;
        };

        let cuts = cut_points(chars, range.clone(), patterns);
        if cuts.is_empty() {
            self.split(chars, range, level + 1, out);
            return;
        }

        let mut start = range.start;
        for end in cuts.into_iter().chain(std::iter::once(range.end)) {
            if end <= start {
                continue;
            }
            let piece = start..end;
            if piece.len() <= self.chunk_size {
                out.push(piece);
            } else {
                self.split(chars, piece, level + 1, out);
            }
            start = end;
        }
    }

    /// Greedily join adjacent pieces while the result fits the target size
    fn merge(&self, pieces: Vec<Range<usize>>) -> Vec<Range<usize>> {
        let mut merged = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for piece in pieces {
            current = match current {
                Some(cur) if piece.end - cur.start <= self.chunk_size => Some(cur.start..piece.end),
                Some(cur) => {
                    merged.push(cur);
                    Some(piece)
                }
                None => Some(piece),
            };
        }
        merged.extend(current);
        merged
    }
}

/// Positions just after each separator occurrence inside `range`
fn cut_points(chars: &[char], range: Range<usize>, patterns: &[&str]) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut i = range.start;
    'scan: while i < range.end {
        for pattern in patterns {
            let len = pattern.chars().count();
            if i + len <= range.end && pattern.chars().zip(&chars[i..]).all(|(p, c)| p == *c) {
                i += len;
                if i < range.end {
                    cuts.push(i);
                }
                continue 'scan;
            }
        }
        i += 1;
    }
    cuts
}
