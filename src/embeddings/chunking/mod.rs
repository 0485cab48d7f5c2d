
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// Position of a chunk within its source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path of the file the chunk was cut from
    pub source_path: String,
    /// Character offset of the first character in the chunk
    pub start_offset: usize,
    /// Character offset one past the last character in the chunk
    pub end_offset: usize,
}

/// A window of source text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Configuration for fixed-size window chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Distance between the starts of consecutive windows.
    ///
    /// Fails when the overlap would stop the window from advancing.
    #[inline]
    pub fn stride(&self) -> Result<usize> {
        if self.chunk_size == 0 || self.overlap >= self.chunk_size {
            return Err(RagError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(self.chunk_size - self.overlap)
    }
}

/// Split file content into overlapping windows of at most `chunk_size` characters.
///
/// Windows start at `0, stride, 2 * stride, ...` and stop once a start reaches the
/// end of the content. Empty content produces no chunks.
#[inline]
pub fn chunk_text(content: &str, source_path: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let stride = config.stride()?;

    // Byte offset of every char boundary, including the end of the string
    let boundaries: Vec<usize> = content
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(content.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(char_count.div_ceil(stride));
    let mut start = 0;
    while start < char_count {
        let end = start + config.chunk_size;
        let clamped_end = end.min(char_count);
        let byte_start = boundaries[start];
        let byte_end = boundaries[clamped_end];
        let text = content.get(byte_start..byte_end).unwrap_or_default();

        chunks.push(Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_path: source_path.to_string(),
                start_offset: start,
                end_offset: clamped_end,
            },
        });
        start = end - config.overlap;
    }

    debug!(
        "Chunked {} ({} chars) into {} chunks",
        source_path,
        char_count,
        chunks.len()
    );

    Ok(chunks)
}
