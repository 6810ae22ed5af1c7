//! Error Types
//!
//! Load and query failures. Errors surface to the caller verbatim.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading a word2vec binary file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("invalid vocab size and/or vector size: vocab_size={vocab_size}, dimension={dimension}")]
    InvalidHeaderValues { vocab_size: i64, dimension: i64 },

    /// End of file inside a word or vector
    #[error("file ends inside record {record} of {vocab_size}")]
    TruncatedRecord { record: u64, vocab_size: u64 },

    #[error("record needs {needed} bytes but the read buffer holds {buffer_size}")]
    RecordExceedsBuffer { needed: usize, buffer_size: usize },

    #[error("{vocab_size} vectors of dimension {dimension} overflow the address space")]
    DimensionOverflow { vocab_size: u32, dimension: u32 },

    #[error("table rejected record: {0}")]
    Table(#[from] QueryError),
}

/// Failure of a similarity query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no embedding table attached")]
    NotLoaded,

    #[error("an embedding table is already attached")]
    AlreadyLoaded,

    #[error("unknown word: {0}")]
    UnknownWord(String),

    #[error("k must be between 1 and {available}, got {k}")]
    InvalidK { k: usize, available: usize },

    #[error("query has dimension {actual}, table has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query vector has zero length")]
    ZeroQuery,
}
