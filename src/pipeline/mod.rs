// Pipeline module
// Index-time (chunk, embed, store) and query-time (embed, search, answer) orchestration


use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info};

use crate::answer::{AnswerGenerator, build_context, build_prompt};
use crate::config::Config;
use crate::database::{SearchResult, VectorStore};
use crate::embeddings::chunking::{Chunk, chunk_text};
use crate::embeddings::{Embedder, IndexedEmbedding, embed_batch};
use crate::scanner::{read_source, scan_files};
use crate::{DimensionLocation, RagError, Result};

/// Counts from one indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub embedded: usize,
    pub skipped: usize,
}

pub struct RetrievalPipeline<E, G> {
    config: Config,
    embedder: E,
    generator: G,
    show_progress: bool,
}

impl<E: Embedder, G: AnswerGenerator> RetrievalPipeline<E, G> {
    #[inline]
    pub fn new(config: Config, embedder: E, generator: G) -> Self {
        Self {
            config,
            embedder,
            generator,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while embedding
    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan the configured root and index every file found
    #[inline]
    pub fn index_codebase(&self) -> Result<(VectorStore, IndexReport)> {
        let files = scan_files(&self.config.scan)?;
        self.index_files(&files)
    }

    /// Chunk, embed, and store `files`, then persist the store.
    ///
    /// Nothing is written unless every step succeeds.
    #[inline]
    pub fn index_files(&self, files: &[PathBuf]) -> Result<(VectorStore, IndexReport)> {
        let mut chunks = Vec::new();
        for file in files {
            let content = read_source(file)?;
            let source_path = file.to_string_lossy();
            chunks.extend(chunk_text(&content, &source_path, &self.config.chunking)?);
        }
        info!("Produced {} chunks from {} files", chunks.len(), files.len());

        let mut report = IndexReport {
            files: files.len(),
            chunks: chunks.len(),
            ..IndexReport::default()
        };

        let store = self.build_store(chunks, &mut report)?;

        store.save(&self.config.index_dir(), &self.config.index.name)?;
        info!(
            "Indexed {} files: {} chunks, {} embedded, {} skipped",
            report.files, report.chunks, report.embedded, report.skipped
        );

        Ok((store, report))
    }

    /// Embed `chunks` and add the ones that succeeded to a fresh store
    fn build_store(&self, chunks: Vec<Chunk>, report: &mut IndexReport) -> Result<VectorStore> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let progress = self.progress_bar();
        let embedded = embed_batch(
            &self.embedder,
            &texts,
            self.config.index.on_embedding_failure,
            &progress,
        )?;

        let AlignedBatch {
            embeddings,
            chunks,
            original_indices,
        } = align_embeddings(embedded, chunks);
        report.embedded = embeddings.len();
        report.skipped = report.chunks - embeddings.len();

        let mut store = VectorStore::new(self.config.ollama.embedding_dimension);
        store
            .add(&embeddings, chunks)
            .map_err(|e| to_original_location(e, &original_indices))?;
        Ok(store)
    }

    /// Load the persisted index, or build and save it when absent
    #[inline]
    pub fn open_or_build(&self) -> Result<VectorStore> {
        let dir = self.config.index_dir();
        let name = &self.config.index.name;

        if VectorStore::exists(&dir, name) {
            info!("Loading existing index {}", name);
            return VectorStore::load(&dir, name, self.config.ollama.embedding_dimension);
        }

        info!("Index {} not found, building it", name);
        let (store, _) = self.index_codebase()?;
        Ok(store)
    }

    /// Top-k chunks for `question`
    #[inline]
    pub fn retrieve(&self, store: &VectorStore, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(question)?;
        if query_embedding.len() != store.dimension() {
            return Err(RagError::DimensionMismatch {
                location: DimensionLocation::Query,
                expected: store.dimension(),
                actual: query_embedding.len(),
            });
        }

        store.search(&query_embedding, self.config.index.top_k)
    }

    /// Answer `question` grounded on the closest chunks in `store`
    #[inline]
    pub fn query(&self, store: &VectorStore, question: &str) -> Result<String> {
        let results = self.retrieve(store, question)?;
        debug!(
            "Retrieved {} chunks for question (best distance {})",
            results.len(),
            results.first().map_or(f32::NAN, |r| r.distance)
        );

        let context = build_context(&results);
        self.generator.generate(&build_prompt(question, &context))
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Generating embeddings {wide_bar}")
        {
            bar.set_style(style);
        }
        bar
    }
}

/// Embeddings paired with their chunks, plus where each pair sat in the
/// chunk sequence before skipped calls were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedBatch {
    pub embeddings: Vec<Vec<f32>>,
    pub chunks: Vec<Chunk>,
    pub original_indices: Vec<usize>,
}

/// Pair each embedding with the chunk it was computed from.
///
/// `embedded` may be shorter than `chunks` when calls were skipped, so the pairing
/// goes through `original_index` rather than position.
#[inline]
pub fn align_embeddings(embedded: Vec<IndexedEmbedding>, chunks: Vec<Chunk>) -> AlignedBatch {
    let mut slots: Vec<Option<Chunk>> = chunks.into_iter().map(Some).collect();
    let mut aligned = AlignedBatch {
        embeddings: Vec::with_capacity(embedded.len()),
        chunks: Vec::with_capacity(embedded.len()),
        original_indices: Vec::with_capacity(embedded.len()),
    };

    for item in embedded {
        if let Some(chunk) = slots.get_mut(item.original_index).and_then(Option::take) {
            aligned.embeddings.push(item.embedding);
            aligned.chunks.push(chunk);
            aligned.original_indices.push(item.original_index);
        }
    }

    aligned
}

/// Rewrite a batch position from the aligned batch into the chunk index it came from
fn to_original_location(error: RagError, original_indices: &[usize]) -> RagError {
    match error {
        RagError::DimensionMismatch {
            location: DimensionLocation::Batch(position),
            expected,
            actual,
        } => RagError::DimensionMismatch {
            location: DimensionLocation::Batch(
                original_indices.get(position).copied().unwrap_or(position),
            ),
            expected,
            actual,
        },
        other => other,
    }
}
