
use bincode::config::standard as bincode_config;
use bincode::{Decode, Encode, decode_from_slice, encode_to_vec};

use crate::{DimensionLocation, RagError, Result};

/// Label returned for slots that have no matching vector
pub const MISSING_LABEL: i64 = -1;

/// Exhaustive L2 index over row-major `f32` vectors
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors stored
    #[inline]
    pub fn ntotal(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data.len() / self.dimension
    }

    /// Append a row-major batch of vectors.
    ///
    /// A batch that does not split into whole rows is rejected; the error points
    /// at the trailing partial row and its length.
    #[inline]
    pub fn add(&mut self, vectors: &[f32]) -> Result<()> {
        if self.dimension == 0 {
            if vectors.is_empty() {
                return Ok(());
            }
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Batch(0),
                expected: 0,
                actual: vectors.len(),
            });
        }

        let partial = vectors.len() % self.dimension;
        if partial != 0 {
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Batch(vectors.len() / self.dimension),
                expected: self.dimension,
                actual: partial,
            });
        }
        self.data.extend_from_slice(vectors);
        Ok(())
    }

    /// Return exactly `k` `(label, squared distance)` pairs ordered by ascending
    /// distance. When fewer than `k` vectors exist the tail is padded with
    /// `(MISSING_LABEL, f32::MAX)`.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Query,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.dimension == 0 {
            return Ok(vec![(MISSING_LABEL, f32::MAX); k]);
        }

        let mut scored: Vec<(i64, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(label, row)| (label as i64, squared_l2(query, row)))
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored.resize(k, (MISSING_LABEL, f32::MAX));

        Ok(scored)
    }

    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_to_vec(self, bincode_config())
            .map_err(|e| RagError::Serialization(format!("Failed to encode index: {}", e)))
    }

    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (index, _): (Self, usize) = decode_from_slice(bytes, bincode_config())
            .map_err(|e| RagError::Corrupt(format!("Failed to decode index: {}", e)))?;

        if index.dimension == 0 || index.data.len() % index.dimension != 0 {
            return Err(RagError::Corrupt(format!(
                "Index data length {} is not a multiple of dimension {}",
                index.data.len(),
                index.dimension
            )));
        }

        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
