// Database module
// Flat L2 similarity index and the chunk-aware store built on it

pub mod flat_index;
pub mod vector_store;

pub use flat_index::FlatL2Index;
pub use vector_store::{SearchResult, VectorStore};
