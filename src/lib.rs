use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

/// Where a dimension mismatch was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionLocation {
    /// Position of the offending vector within a batch
    Batch(usize),
    /// The query embedding
    Query,
    /// A persisted index blob
    Persisted,
}

impl fmt::Display for DimensionLocation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch(index) => write!(f, "embedding {}", index),
            Self::Query => f.write_str("query embedding"),
            Self::Persisted => f.write_str("persisted index"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Dimension mismatch for {location}: expected {expected}, got {actual}")]
    DimensionMismatch {
        location: DimensionLocation,
        expected: usize,
        actual: usize,
    },

    #[error("No valid results were found in the vector store")]
    EmptyResult,

    #[error(
        "Index artifacts not found: {} and {}",
        index_path.display(),
        metadata_path.display()
    )]
    NotFound {
        index_path: PathBuf,
        metadata_path: PathBuf,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid chunking: overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod pipeline;
pub mod scanner;
