//! Vector Module
//!
//! Embedding storage, vector math and exact similarity search.

mod search;
mod similarity;
mod table;

pub use search::{format_hits, Hit, SimilarityEngine};
pub use similarity::{dot, is_unit, l2_norm, normalize_into, normalized};
pub use table::{EmbeddingTable, TableBuilder};
