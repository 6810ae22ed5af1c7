//! wordvec - word2vec Binary Loader and Similarity Search
//!
//! Loads embeddings in the original word2vec binary format into a
//! contiguous, normalized table and answers exact nearest-word and
//! analogy queries by cosine similarity.

pub mod error;
pub mod loader;
pub mod metrics;
pub mod stats;
pub mod vector;

pub use error::{LoadError, QueryError};
pub use loader::{load, LoadReport, Loader, LoaderConfig};
pub use metrics::{format_elapsed, Metrics};
pub use stats::CorpusStats;
pub use vector::{format_hits, EmbeddingTable, Hit, SimilarityEngine};
