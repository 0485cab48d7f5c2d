#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::flat_index::FlatL2Index;
use crate::embeddings::chunking::Chunk;
use crate::{DimensionLocation, RagError, Result};

const METADATA_VERSION: u32 = 1;

/// Exact-search vector store: a flat L2 index plus the chunk behind each vector.
///
/// The i-th vector in the index belongs to the i-th entry of `chunks`. Both are
/// only ever extended together by [`VectorStore::add`].
#[derive(Debug, Clone)]
pub struct VectorStore {
    index: FlatL2Index,
    chunks: Vec<Chunk>,
    dimension: usize,
}

/// A chunk retrieved by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Squared L2 distance to the query, smaller is closer
    pub distance: f32,
}

/// On-disk shape of the metadata artifact
#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    version: u32,
    dimension: usize,
    created_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
}

impl VectorStore {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            index: FlatL2Index::new(dimension),
            chunks: Vec::new(),
            dimension,
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Append a batch of embeddings with their chunks.
    ///
    /// Callers must pass `embeddings` and `chunks` of equal length. Every
    /// embedding is checked against the store dimension before anything is
    /// inserted, so a failed call leaves the store unchanged.
    #[inline]
    pub fn add(&mut self, embeddings: &[Vec<f32>], chunks: Vec<Chunk>) -> Result<()> {
        debug_assert_eq!(embeddings.len(), chunks.len());

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    location: DimensionLocation::Batch(i),
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        if embeddings.is_empty() {
            return Ok(());
        }

        let flat: Vec<f32> = embeddings.iter().flatten().copied().collect();
        self.index.add(&flat)?;
        self.chunks.extend(chunks);

        debug!(
            "Added {} vectors to store (total {})",
            embeddings.len(),
            self.chunks.len()
        );
        Ok(())
    }

    /// Exact k-nearest-neighbour search ordered by ascending distance.
    ///
    /// Returns at most `k` results and never an entry without a chunk. Fails with
    /// [`RagError::EmptyResult`] when nothing valid is found.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Query,
                expected: self.dimension,
                actual: query.len(),
            });
        }

        // At most one sentinel slot is needed past the stored vectors
        let hits = self.index.search(query, k.min(self.index.ntotal() + 1))?;

        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|(label, distance)| {
                let position = usize::try_from(label).ok()?;
                self.chunks.get(position).map(|chunk| SearchResult {
                    chunk: chunk.clone(),
                    distance,
                })
            })
            .collect();

        if results.is_empty() {
            return Err(RagError::EmptyResult);
        }

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Paths of the index blob and metadata file for `name` under `dir`
    #[inline]
    pub fn artifact_paths(dir: &Path, name: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}.index", name)),
            dir.join(format!("{}_meta.json", name)),
        )
    }

    /// Whether both artifacts for `name` exist under `dir`
    #[inline]
    pub fn exists(dir: &Path, name: &str) -> bool {
        let (index_path, metadata_path) = Self::artifact_paths(dir, name);
        index_path.is_file() && metadata_path.is_file()
    }

    /// Write both artifacts, replacing any previous ones.
    ///
    /// Both files are staged next to their final paths and only renamed into
    /// place once both writes succeeded, so a failed save leaves earlier
    /// artifacts untouched.
    #[inline]
    pub fn save(&self, dir: &Path, name: &str) -> Result<()> {
        fs::create_dir_all(dir)?;
        let (index_path, metadata_path) = Self::artifact_paths(dir, name);
        let index_tmp = staging_path(&index_path);
        let metadata_tmp = staging_path(&metadata_path);

        let index_bytes = self.index.to_bytes()?;
        let metadata = MetadataFile {
            version: METADATA_VERSION,
            dimension: self.dimension,
            created_at: Utc::now(),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_vec(&metadata)
            .map_err(|e| RagError::Serialization(format!("Failed to encode metadata: {}", e)))?;

        let staged =
            fs::write(&index_tmp, &index_bytes).and_then(|()| fs::write(&metadata_tmp, json));
        if let Err(e) = staged {
            discard_staged(&[index_tmp.as_path(), metadata_tmp.as_path()]);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&index_tmp, &index_path) {
            discard_staged(&[index_tmp.as_path(), metadata_tmp.as_path()]);
            return Err(e.into());
        }
        fs::rename(&metadata_tmp, &metadata_path)?;

        info!(
            "Saved {} vectors to {} ({} bytes)",
            self.len(),
            index_path.display(),
            index_bytes.len()
        );
        Ok(())
    }

    /// Load both artifacts into a store of the given dimension
    #[inline]
    pub fn load(dir: &Path, name: &str, dimension: usize) -> Result<Self> {
        let (index_path, metadata_path) = Self::artifact_paths(dir, name);
        if !index_path.is_file() || !metadata_path.is_file() {
            return Err(RagError::NotFound {
                index_path,
                metadata_path,
            });
        }

        let index = FlatL2Index::from_bytes(&fs::read(&index_path)?)?;
        if index.dimension() != dimension {
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Persisted,
                expected: dimension,
                actual: index.dimension(),
            });
        }

        let metadata: MetadataFile = serde_json::from_slice(&fs::read(&metadata_path)?)
            .map_err(|e| RagError::Corrupt(format!("Failed to decode metadata: {}", e)))?;

        if metadata.version != METADATA_VERSION {
            warn!(
                "Metadata version {} differs from expected {}",
                metadata.version, METADATA_VERSION
            );
        }
        if metadata.dimension != dimension {
            return Err(RagError::Corrupt(format!(
                "Metadata records dimension {} but index has {}",
                metadata.dimension, dimension
            )));
        }
        if metadata.chunks.len() != index.ntotal() {
            return Err(RagError::Corrupt(format!(
                "Index holds {} vectors but metadata holds {} chunks",
                index.ntotal(),
                metadata.chunks.len()
            )));
        }

        info!(
            "Loaded {} vectors from {} (created {})",
            metadata.chunks.len(),
            index_path.display(),
            metadata.created_at.format("%Y-%m-%d %H:%M:%S")
        );

        Ok(Self {
            index,
            chunks: metadata.chunks,
            dimension,
        })
    }

    /// Creation time recorded in the metadata artifact, if readable
    #[inline]
    pub fn created_at(dir: &Path, name: &str) -> Option<DateTime<Utc>> {
        let (_, metadata_path) = Self::artifact_paths(dir, name);
        let bytes = fs::read(metadata_path).ok()?;
        serde_json::from_slice::<MetadataFile>(&bytes)
            .ok()
            .map(|m| m.created_at)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

fn discard_staged(paths: &[&Path]) {
    for path in paths {
        if !path.is_file() {
            continue;
        }
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove staged file {}: {}", path.display(), e);
        }
    }
}
