//! word2vec Binary Codec
//!
//! Incremental decoders for the word2vec binary format:
//!
//! ```text
//! <vocab_size> <dimension>\n
//! <word> <dimension x f32 little-endian>[\n]
//! <word> <dimension x f32 little-endian>[\n]
//! ...
//! ```
//!
//! Both decoders follow the `Decoder` contract: `Ok(None)` means the buffer
//! does not yet hold a complete item. Newlines between records are dropped
//! even then; the bytes of the record itself stay in place.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::LoadError;

/// Size of one encoded float
pub const FLOAT_SIZE: usize = 4;

/// Parsed header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub vocab_size: u32,
    pub dimension: u32,
}

impl Header {
    /// Parse the header line (without its trailing newline)
    pub fn parse(line: &[u8]) -> Result<Self, LoadError> {
        if !line.is_ascii() {
            return Err(LoadError::MalformedHeader("header line is not ASCII".to_string()));
        }
        let text = String::from_utf8_lossy(line);
        let mut tokens = text.split_ascii_whitespace();

        let vocab_size = parse_count(tokens.next(), "vocab size")?;
        let dimension = parse_count(tokens.next(), "dimension")?;

        let in_range = |v: i64| v > 0 && v <= u32::MAX as i64;
        if !in_range(vocab_size) || !in_range(dimension) {
            return Err(LoadError::InvalidHeaderValues {
                vocab_size,
                dimension,
            });
        }

        let header = Self {
            vocab_size: vocab_size as u32,
            dimension: dimension as u32,
        };
        header.vectors_len()?;
        Ok(header)
    }

    /// Total bytes of vector data the file declares
    pub fn vectors_len(&self) -> Result<usize, LoadError> {
        (self.vocab_size as usize)
            .checked_mul(self.dimension as usize)
            .and_then(|n| n.checked_mul(FLOAT_SIZE))
            .ok_or(LoadError::DimensionOverflow {
                vocab_size: self.vocab_size,
                dimension: self.dimension,
            })
    }

    /// Bytes of one encoded vector
    pub fn vector_len(&self) -> usize {
        self.dimension as usize * FLOAT_SIZE
    }
}

fn parse_count(token: Option<&str>, what: &str) -> Result<i64, LoadError> {
    let token = token.ok_or_else(|| LoadError::MalformedHeader(format!("missing {}", what)))?;
    token
        .parse::<i64>()
        .map_err(|_| LoadError::MalformedHeader(format!("{} is not an integer: {:?}", what, token)))
}

/// Decodes the header line
#[derive(Debug, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = Header;
    type Error = LoadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Header>, LoadError> {
        let Some(newline) = src.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let line = src.split_to(newline + 1);
        Header::parse(&line[..newline]).map(Some)
    }
}

/// One `(word, vector)` record as stored in the file
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Word, trimmed of surrounding ASCII whitespace
    pub word: String,
    /// Vector exactly as encoded
    pub vector: Vec<f32>,
}

/// Decodes `(word, vector)` records of a fixed dimension
#[derive(Debug)]
pub struct RecordDecoder {
    dimension: usize,
    /// Size of the record seen last time the buffer ran short, if known
    pending_len: Option<usize>,
}

impl RecordDecoder {
    pub fn new(header: &Header) -> Self {
        Self {
            dimension: header.dimension as usize,
            pending_len: None,
        }
    }

    /// Bytes the incomplete record at the buffer head needs, once its word
    /// separator has been seen
    pub fn pending_len(&self) -> Option<usize> {
        self.pending_len
    }
}

impl Decoder for RecordDecoder {
    type Item = RawRecord;
    type Error = LoadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawRecord>, LoadError> {
        // Some producers put a newline between records, some don't. Drop
        // them before anything else so they never count against the buffer.
        let skip = src.iter().take_while(|&&b| b == b'\n').count();
        src.advance(skip);

        let Some(word_end) = src.iter().position(|&b| b == b' ') else {
            self.pending_len = None;
            return Ok(None);
        };

        let record_len = word_end + 1 + self.dimension * FLOAT_SIZE;
        if src.len() < record_len {
            self.pending_len = Some(record_len);
            return Ok(None);
        }
        self.pending_len = None;

        let mut record = src.split_to(record_len);
        let word = String::from_utf8_lossy(record[..word_end].trim_ascii()).into_owned();
        record.advance(word_end + 1);

        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            vector.push(record.get_f32_le());
        }

        Ok(Some(RawRecord { word, vector }))
    }
}
