//! Similarity Engine
//!
//! Exact top-K search over an [`EmbeddingTable`] by a single linear scan.
//! Queries take `&self` and keep all scratch state on the stack, so one
//! engine can serve concurrent searches without locking.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use hashbrown::HashSet;
use tracing::debug;

use super::similarity::{dot, is_unit, normalized};
use super::table::EmbeddingTable;
use crate::error::QueryError;

/// Tolerance under which a query is treated as already unit length
const UNIT_TOLERANCE: f64 = 1e-5;

/// A scored search result
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// The matching word
    pub word: String,
    /// Cosine similarity to the query, in `[-1, 1]`
    pub score: f64,
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4})", self.word, self.score)
    }
}

/// Render hits as `word (0.1234), word (0.0123)`
pub fn format_hits(hits: &[Hit]) -> String {
    hits.iter()
        .map(Hit::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Heap entry for the top-K scan
///
/// Ordered by score, then by earlier row, so that among equal scores the
/// later row is the minimum and is evicted first.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    row: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.row.cmp(&self.row))
    }
}

/// Keep the `k` best rows of `table` against `query`, skipping `excluded`
///
/// Results are sorted by score descending, then row ascending.
fn top_k(table: &EmbeddingTable, query: &[f32], excluded: &HashSet<usize>, k: usize) -> Vec<Candidate> {
    // Min-heap of the best k seen so far
    let mut best: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);

    for (row, (_, vector)) in table.iter().enumerate() {
        if excluded.contains(&row) {
            continue;
        }
        let score = dot(query, vector);
        if best.len() < k {
            best.push(Reverse(Candidate { score, row }));
            continue;
        }
        // Strict comparison keeps the earlier row on ties
        if let Some(Reverse(min)) = best.peek() {
            if score > min.score {
                best.pop();
                best.push(Reverse(Candidate { score, row }));
            }
        }
    }

    let mut results: Vec<Candidate> = best.into_iter().map(|Reverse(c)| c).collect();
    results.sort_by(|a, b| b.cmp(a));
    results
}

/// Nearest-word and analogy search over an attached table
///
/// Starts empty; [`attach`](Self::attach) moves it to the loaded state once.
#[derive(Debug, Default)]
pub struct SimilarityEngine {
    table: Option<EmbeddingTable>,
}

impl SimilarityEngine {
    /// Create an engine with no table attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that owns `table`
    pub fn with_table(table: EmbeddingTable) -> Self {
        Self { table: Some(table) }
    }

    /// Attach a table. Fails if one is already attached.
    pub fn attach(&mut self, table: EmbeddingTable) -> Result<(), QueryError> {
        if self.table.is_some() {
            return Err(QueryError::AlreadyLoaded);
        }
        self.table = Some(table);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    /// The attached table, if any
    pub fn table(&self) -> Option<&EmbeddingTable> {
        self.table.as_ref()
    }

    fn loaded(&self) -> Result<&EmbeddingTable, QueryError> {
        self.table.as_ref().ok_or(QueryError::NotLoaded)
    }

    /// Find the `k` words closest to `word`, excluding `word` itself
    pub fn nearest(&self, word: &str, k: usize) -> Result<Vec<Hit>, QueryError> {
        let table = self.loaded()?;
        let row = table
            .position(word)
            .ok_or_else(|| QueryError::UnknownWord(word.to_string()))?;

        let excluded: HashSet<usize> = std::iter::once(row).collect();
        let hits = Self::rank(table, table.row(row), &excluded, k)?;
        debug!("nearest({}, {}) scanned {} rows", word, k, table.len());
        Ok(hits)
    }

    /// Words closest to `v(b) - v(a) + v(c)`: "a is to b as c is to ...?"
    ///
    /// `a`, `b` and `c` never appear in the results.
    pub fn analogy(&self, a: &str, b: &str, c: &str, k: usize) -> Result<Vec<Hit>, QueryError> {
        let table = self.loaded()?;
        let lookup = |w: &str| {
            table
                .position(w)
                .ok_or_else(|| QueryError::UnknownWord(w.to_string()))
        };
        let (row_a, row_b, row_c) = (lookup(a)?, lookup(b)?, lookup(c)?);

        let (va, vb, vc) = (table.row(row_a), table.row(row_b), table.row(row_c));
        let combined: Vec<f32> = va
            .iter()
            .zip(vb)
            .zip(vc)
            .map(|((&xa, &xb), &xc)| xb - xa + xc)
            .collect();
        let query = normalized(&combined).ok_or(QueryError::ZeroQuery)?;

        let excluded: HashSet<usize> = [row_a, row_b, row_c].into_iter().collect();
        let hits = Self::rank(table, &query, &excluded, k)?;
        debug!("analogy({}, {}, {}, {}) scanned {} rows", a, b, c, k, table.len());
        Ok(hits)
    }

    /// Find the `k` words closest to an arbitrary query vector
    ///
    /// The query is normalized if it is not already unit length. Words in
    /// `exclude` that are not in the table are ignored.
    pub fn search(&self, query: &[f32], exclude: &[&str], k: usize) -> Result<Vec<Hit>, QueryError> {
        let table = self.loaded()?;
        if query.len() != table.dim() {
            return Err(QueryError::DimensionMismatch {
                expected: table.dim(),
                actual: query.len(),
            });
        }

        let excluded: HashSet<usize> = exclude.iter().filter_map(|w| table.position(w)).collect();
        if is_unit(query, UNIT_TOLERANCE) {
            Self::rank(table, query, &excluded, k)
        } else {
            let unit = normalized(query).ok_or(QueryError::ZeroQuery)?;
            Self::rank(table, &unit, &excluded, k)
        }
    }

    fn rank(
        table: &EmbeddingTable,
        query: &[f32],
        excluded: &HashSet<usize>,
        k: usize,
    ) -> Result<Vec<Hit>, QueryError> {
        let available = table.len() - excluded.len();
        if k == 0 || k > available {
            return Err(QueryError::InvalidK { k, available });
        }

        Ok(top_k(table, query, excluded, k)
            .into_iter()
            .map(|c| Hit {
                word: table.word(c.row).to_string(),
                score: c.score,
            })
            .collect())
    }
}
