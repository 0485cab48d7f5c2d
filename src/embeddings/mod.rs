// Embeddings module
// Chunking, the Ollama client, and the batch embedding loop


pub mod chunking;
pub mod ollama;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{DimensionLocation, RagError, Result};

pub use chunking::{Chunk, ChunkMetadata, ChunkingConfig, chunk_text};
pub use ollama::OllamaClient;

/// Maps text to a fixed-length vector
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// What to do when a single embedding call fails during a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and continue with the next text
    #[default]
    Skip,
    /// Stop the batch and return the error
    Abort,
}

/// An embedding paired with the position of the text it came from
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEmbedding {
    pub original_index: usize,
    pub embedding: Vec<f32>,
}

/// Embed every text one call at a time.
///
/// Under [`FailurePolicy::Skip`] failed calls are logged and dropped, so the result
/// may be shorter than `texts`; `original_index` tells which texts succeeded. Once
/// the loop is done all vectors must share the first vector's length.
#[inline]
pub fn embed_batch<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    policy: FailurePolicy,
    progress: &ProgressBar,
) -> Result<Vec<IndexedEmbedding>> {
    debug!("Generating embeddings for {} texts", texts.len());
    progress.set_length(texts.len() as u64);

    let mut embeddings = Vec::with_capacity(texts.len());
    for (original_index, text) in texts.iter().enumerate() {
        match embedder.embed(text) {
            Ok(embedding) => embeddings.push(IndexedEmbedding {
                original_index,
                embedding,
            }),
            Err(e) => match policy {
                FailurePolicy::Skip => {
                    warn!("Skipping text {}: {}", original_index, e);
                }
                FailurePolicy::Abort => {
                    progress.abandon();
                    return Err(e);
                }
            },
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    validate_dimensions(&embeddings)?;

    let skipped = texts.len() - embeddings.len();
    if skipped > 0 {
        warn!(
            "Generated {} of {} embeddings ({} skipped)",
            embeddings.len(),
            texts.len(),
            skipped
        );
    } else {
        info!("Generated {} embeddings", embeddings.len());
    }

    Ok(embeddings)
}

/// Check that all embeddings share the length of the first one
fn validate_dimensions(embeddings: &[IndexedEmbedding]) -> Result<()> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    let expected = first.embedding.len();

    match embeddings.iter().find(|e| e.embedding.len() != expected) {
        Some(offender) => Err(RagError::DimensionMismatch {
            location: DimensionLocation::Batch(offender.original_index),
            expected,
            actual: offender.embedding.len(),
        }),
        None => Ok(()),
    }
}
