//! Deterministic fixed-length window chunking.
//!
//! Raw text is split into successive windows of `chunk_size` characters
//! starting at offsets 0, (C−O), 2(C−O), … so that each window shares its
//! last `overlap` characters with the start of the next. The overlap keeps
//! context visible across window boundaries when each window is summarized
//! on its own. Offsets are character offsets; a window never splits a UTF-8
//! sequence.

use super::types::{ChunkingError, TextChunk};

/// Split raw text into overlapping windows with contiguous ordinals.
///
/// Requires `chunk_size > overlap`; anything else cannot advance the window
/// start and fails fast with [`ChunkingError::InvalidChunkConfig`]. The final
/// window is truncated to the remaining text. Text of length ≤ `chunk_size`
/// produces exactly one chunk equal to the whole text. Whitespace-only input
/// yields no chunks; the extractor rejects such documents before this point.
pub(crate) fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TextChunk>, ChunkingError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ChunkingError::InvalidChunkConfig {
            chunk_size,
            overlap,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = usize::min(start + chunk_size, chars.len());
        chunks.push(TextChunk {
            ordinal: chunks.len(),
            text: chars[start..end].iter().collect(),
        });
        start += stride;
    }

    Ok(chunks)
}
