//! Embedding Table
//!
//! Row-major contiguous vector storage with a hash index on words.
//! Iteration follows insertion order; lookups go through the index.

use hashbrown::HashMap;
use tracing::warn;

use super::similarity::normalize_into;
use crate::error::QueryError;

/// Immutable word -> unit vector table
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    /// Vector dimension
    dim: usize,
    /// `len * dim` floats, one row per word
    data: Vec<f32>,
    /// Row -> word
    words: Vec<String>,
    /// Word -> row
    index: HashMap<String, usize>,
}

impl EmbeddingTable {
    /// Build a table from in-memory rows, normalizing each vector
    ///
    /// Rows with the wrong dimension or a zero vector are skipped. Later
    /// duplicates overwrite earlier ones.
    pub fn from_rows<W, V, I>(dim: usize, rows: I) -> Self
    where
        W: Into<String>,
        V: AsRef<[f32]>,
        I: IntoIterator<Item = (W, V)>,
    {
        let mut builder = TableBuilder::new(dim);
        let mut unit = vec![0.0f32; dim];
        for (word, vector) in rows {
            let vector = vector.as_ref();
            // `unit` always has the builder's dimension, so insert cannot fail
            if vector.len() == dim && normalize_into(vector, &mut unit) {
                let _ = builder.insert(word, &unit);
            }
        }
        builder.build()
    }

    /// Vector dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Look up the vector for a word
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.position(word).map(|row| self.row(row))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Row index of a word
    pub fn position(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Word stored at a row
    ///
    /// Panics if `row >= len()`.
    pub fn word(&self, row: usize) -> &str {
        &self.words[row]
    }

    /// Vector stored at a row
    ///
    /// Panics if `row >= len()`.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Iterate `(word, vector)` pairs in insertion order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &[f32])> + '_ {
        self.words
            .iter()
            .map(String::as_str)
            .zip(self.data.chunks_exact(self.dim.max(1)))
    }

    /// Iterate words in insertion order
    pub fn words(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }
}

/// Incremental builder for an [`EmbeddingTable`]
///
/// Vectors are stored as given; callers normalize before inserting.
#[derive(Debug)]
pub struct TableBuilder {
    dim: usize,
    data: Vec<f32>,
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl TableBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
            words: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a builder with room for `rows` words
    ///
    /// The reservation is a hint. If the allocator refuses it the builder
    /// starts empty and grows on demand.
    pub fn with_capacity(dim: usize, rows: usize) -> Self {
        let mut builder = Self::new(dim);
        let floats = rows.saturating_mul(dim);
        if let Err(e) = builder.data.try_reserve_exact(floats) {
            warn!("Could not reserve {} vector floats up front: {}", floats, e);
            return builder;
        }
        if builder.words.try_reserve_exact(rows).is_err() || builder.index.try_reserve(rows).is_err() {
            warn!("Could not reserve index space for {} words", rows);
        }
        builder
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Insert a vector, overwriting the vector of an existing word in place
    ///
    /// Returns `true` when the word was already present. The row keeps the
    /// position of the first insertion.
    pub fn insert(&mut self, word: impl Into<String>, vector: &[f32]) -> Result<bool, QueryError> {
        if vector.len() != self.dim {
            return Err(QueryError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let word = word.into();
        if let Some(&row) = self.index.get(word.as_str()) {
            let start = row * self.dim;
            self.data[start..start + self.dim].copy_from_slice(vector);
            return Ok(true);
        }

        let row = self.words.len();
        self.data.extend_from_slice(vector);
        self.index.insert(word.clone(), row);
        self.words.push(word);
        Ok(false)
    }

    /// Freeze into a read-only table
    pub fn build(self) -> EmbeddingTable {
        EmbeddingTable {
            dim: self.dim,
            data: self.data,
            words: self.words,
            index: self.index,
        }
    }
}
