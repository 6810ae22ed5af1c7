//! Loader Module
//!
//! Streams a word2vec binary file through a bounded buffer into an
//! [`EmbeddingTable`], normalizing every accepted vector on the way in.

mod codec;
mod config;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::vector::{normalize_into, EmbeddingTable, TableBuilder};

pub use codec::{Header, HeaderDecoder, RawRecord, RecordDecoder, FLOAT_SIZE};
pub use config::{LoaderConfig, MAX_READ_SIZE};

/// Load a word2vec binary file with the default configuration
pub fn load<P: AsRef<Path>>(path: P) -> Result<EmbeddingTable, LoadError> {
    Loader::default().load(path)
}

/// Summary of one load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Vocabulary size declared by the header
    pub vocab_size: u32,
    /// Vector dimension declared by the header
    pub dimension: u32,
    /// Records read from the file
    pub records: u64,
    /// Words in the finished table
    pub inserted: usize,
    /// Words dropped for being too short
    pub rejected_words: u64,
    /// Vectors dropped for having zero or non-finite length
    pub rejected_vectors: u64,
    /// Words seen again whose vector replaced the earlier one
    pub duplicates: u64,
    /// Reads that filled the buffer, including the first
    pub buffer_fills: u64,
    /// Read buffer size used
    pub buffer_size: usize,
    /// Wall time of the load
    pub elapsed: Duration,
}

/// Outcome of pulling the next item through the buffer
enum Next<T> {
    Item(T),
    /// The source ended before a complete item
    Eof,
    /// The buffer is full and still holds no complete item
    Full,
}

/// Bounded read buffer over a byte source
struct Source<R> {
    reader: R,
    buffer_size: usize,
    /// Source offset of the buffer's end
    offset: u64,
    fills: u64,
    eof: bool,
}

impl<R: Read> Source<R> {
    fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader,
            buffer_size,
            offset: 0,
            fills: 0,
            eof: false,
        }
    }

    /// Keep the unread tail of `buf` and read behind it until full or EOF
    fn refill(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let carried = buf.len();
        buf.resize(self.buffer_size, 0);

        let mut filled = carried;
        while filled < self.buffer_size {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    buf.truncate(carried);
                    return Err(e);
                }
            }
        }
        buf.truncate(filled);

        let read = filled - carried;
        debug!(
            "Refilling: source offset = {}, carried = {}, bytes read = {}",
            self.offset, carried, read
        );
        self.offset += read as u64;
        self.fills += 1;
        if read == 0 {
            self.eof = true;
        }
        Ok(read)
    }

    /// Decode the next item, refilling the buffer as often as needed
    fn next<D>(&mut self, decoder: &mut D, buf: &mut BytesMut) -> Result<Next<D::Item>, LoadError>
    where
        D: Decoder<Error = LoadError>,
    {
        loop {
            if let Some(item) = decoder.decode(buf)? {
                return Ok(Next::Item(item));
            }
            if self.eof {
                return Ok(Next::Eof);
            }
            if buf.len() >= self.buffer_size {
                return Ok(Next::Full);
            }
            self.refill(buf)?;
        }
    }
}

/// word2vec binary loader
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a file into a table
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<EmbeddingTable, LoadError> {
        self.load_with_report(path).map(|(table, _)| table)
    }

    /// Load a file into a table and report what was read
    pub fn load_with_report<P: AsRef<Path>>(&self, path: P) -> Result<(EmbeddingTable, LoadReport), LoadError> {
        let path = path.as_ref();
        let open_error = |source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_error)?;
        let len = file.metadata().map_err(open_error)?.len();
        debug!("Opened {} ({} bytes)", path.display(), len);

        self.load_reader(file, Some(len))
    }

    /// Load from any byte source
    ///
    /// `len_hint` is the source length if known; it only bounds the buffer.
    pub fn load_reader<R: Read>(&self, reader: R, len_hint: Option<u64>) -> Result<(EmbeddingTable, LoadReport), LoadError> {
        let started = Instant::now();
        let buffer_size = self.config.effective_buffer_size(len_hint);
        let mut source = Source::new(reader, buffer_size);
        let mut buf = BytesMut::with_capacity(buffer_size);

        let header = match source.next(&mut HeaderDecoder, &mut buf)? {
            Next::Item(header) => header,
            Next::Eof if buf.is_empty() => {
                return Err(LoadError::MalformedHeader("file is empty".to_string()))
            }
            Next::Eof => {
                return Err(LoadError::MalformedHeader("header line is not terminated".to_string()))
            }
            Next::Full => {
                return Err(LoadError::MalformedHeader(format!(
                    "no newline in the first {} bytes",
                    buffer_size
                )))
            }
        };
        self.check_record_bound(&header)?;

        info!(
            "Loading map for {} word vectors, dimension {}",
            header.vocab_size, header.dimension
        );

        let dim = header.dimension as usize;
        let mut builder = TableBuilder::with_capacity(dim, header.vocab_size as usize);
        let mut decoder = RecordDecoder::new(&header);
        let mut unit = vec![0.0f32; dim];
        let mut report = LoadReport {
            vocab_size: header.vocab_size,
            dimension: header.dimension,
            buffer_size,
            ..LoadReport::default()
        };

        for ordinal in 1..=u64::from(header.vocab_size) {
            let record = match source.next(&mut decoder, &mut buf)? {
                Next::Item(record) => record,
                Next::Eof => {
                    return Err(LoadError::TruncatedRecord {
                        record: ordinal,
                        vocab_size: u64::from(header.vocab_size),
                    })
                }
                Next::Full => {
                    return Err(LoadError::RecordExceedsBuffer {
                        needed: decoder.pending_len().unwrap_or(buf.len() + 1),
                        buffer_size,
                    })
                }
            };
            report.records += 1;

            if !self.good_word(&record.word) {
                report.rejected_words += 1;
                continue;
            }
            if !normalize_into(&record.vector, &mut unit) {
                report.rejected_vectors += 1;
                continue;
            }
            if builder.insert(record.word, &unit)? {
                report.duplicates += 1;
            }
        }

        let table = builder.build();
        report.inserted = table.len();
        report.buffer_fills = source.fills;
        report.elapsed = started.elapsed();

        info!(
            "Loaded map with {} words, {} duplicates replaced, {} short words and {} zero vectors skipped",
            report.inserted, report.duplicates, report.rejected_words, report.rejected_vectors
        );
        Ok((table, report))
    }

    fn good_word(&self, word: &str) -> bool {
        word.len() >= self.config.min_word_len
    }

    /// The configured buffer must hold the longest record the header allows
    fn check_record_bound(&self, header: &Header) -> Result<(), LoadError> {
        let buffer_size = self.config.buffer_size.clamp(1, MAX_READ_SIZE);
        let needed = self
            .config
            .max_word_bytes
            .saturating_add(1)
            .saturating_add(header.vector_len());
        if needed > buffer_size {
            return Err(LoadError::RecordExceedsBuffer { needed, buffer_size });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::vector::{is_unit, SimilarityEngine};
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    /// Encode one record; `lead` newlines go before the word
    fn record(word: &str, vector: &[f32], lead: usize) -> Vec<u8> {
        let mut out = vec![b'\n'; lead];
        out.extend_from_slice(word.as_bytes());
        out.push(b' ');
        for x in vector {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }

    /// Encode a file the way the word2vec tool writes it
    fn w2v(header: &str, records: &[(&str, &[f32])]) -> Vec<u8> {
        let mut out = header.as_bytes().to_vec();
        for (i, (word, vector)) in records.iter().enumerate() {
            out.extend(record(word, vector, usize::from(i > 0)));
        }
        out.push(b'\n');
        out
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn s1_bytes() -> Vec<u8> {
        w2v(
            "3 2\n",
            &[("a", &[1.0, 0.0]), ("bb", &[0.0, 1.0]), ("cc", &[1.0, 1.0])],
        )
    }

    #[test]
    fn test_load_and_query() {
        let file = write_temp(&s1_bytes());
        let loader = Loader::new(LoaderConfig::default().with_min_word_len(1));
        let table = loader.load(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.dim(), 2);
        assert_eq!(table.get("a"), Some(&[1.0f32, 0.0][..]));
        let cc = table.get("cc").unwrap();
        assert!((cc[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((cc[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        let engine = SimilarityEngine::with_table(table);
        let hits = engine.nearest("a", 2).unwrap();
        assert_eq!(hits[0].word, "cc");
        assert!((hits[0].score - 0.7071).abs() < 1e-4);
        assert_eq!(hits[1].word, "bb");
        assert!(hits[1].score.abs() < 1e-6);

        assert_eq!(
            engine.nearest("a", 3),
            Err(QueryError::InvalidK { k: 3, available: 2 })
        );
    }

    #[test]
    fn test_short_words_filtered() {
        let bytes = w2v(
            "3 2\n",
            &[("x", &[1.0, 0.0]), ("bb", &[0.0, 1.0]), ("\u{e9}", &[1.0, 1.0])],
        );
        let file = write_temp(&bytes);
        let (table, report) = Loader::default().load_with_report(file.path()).unwrap();

        assert!(!table.contains("x"));
        // Two bytes in UTF-8
        assert!(table.contains("\u{e9}"));
        assert_eq!(report.records, 3);
        assert_eq!(report.rejected_words, 1);
        assert_eq!(report.inserted, 2);

        let engine = SimilarityEngine::with_table(table);
        assert_eq!(
            engine.nearest("x", 1),
            Err(QueryError::UnknownWord("x".to_string()))
        );
    }

    #[test]
    fn test_duplicates_last_vector_wins() {
        let bytes = w2v(
            "3 2\n",
            &[("foo", &[1.0, 0.0]), ("bar", &[0.0, 1.0]), ("foo", &[0.0, 3.0])],
        );
        let file = write_temp(&bytes);
        let (table, report) = Loader::default().load_with_report(file.path()).unwrap();

        assert_eq!(report.duplicates, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("foo"), Some(&[0.0f32, 1.0][..]));
        assert_eq!(table.position("foo"), Some(0));
    }

    #[test]
    fn test_truncated_vector() {
        let mut bytes = s1_bytes();
        // Drop the trailing newline and half of the last vector
        bytes.truncate(bytes.len() - 5);
        let file = write_temp(&bytes);

        let err = Loader::default().load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::TruncatedRecord {
                record: 3,
                vocab_size: 3
            }
        ));
    }

    #[test]
    fn test_truncated_word() {
        let mut bytes = b"2 1\n".to_vec();
        bytes.extend(record("first", &[1.0], 0));
        bytes.extend_from_slice(b"\nsec");
        let file = write_temp(&bytes);

        let err = Loader::default().load(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::TruncatedRecord { record: 2, .. }));
    }

    #[test]
    fn test_missing_records() {
        let bytes = w2v("5 2\n", &[("aa", &[1.0, 0.0]), ("bb", &[0.0, 1.0])]);
        let file = write_temp(&bytes);

        let err = Loader::default().load(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::TruncatedRecord { record: 3, .. }));
    }

    #[test]
    fn test_small_buffer_matches_large() {
        let vectors: Vec<Vec<f32>> = (0..20)
            .map(|i| {
                let t = i as f32;
                vec![t + 1.0, -t, (t * 0.3).sin()]
            })
            .collect();
        let words: Vec<String> = (0..20).map(|i| format!("w{:02}", i)).collect();
        let records: Vec<(&str, &[f32])> = words
            .iter()
            .zip(&vectors)
            .map(|(w, v)| (w.as_str(), v.as_slice()))
            .collect();
        let file = write_temp(&w2v("20 3\n", &records));

        let (big, big_report) = Loader::default().load_with_report(file.path()).unwrap();
        let small_loader = Loader::new(
            LoaderConfig::default()
                .with_buffer_size(24)
                .with_max_word_bytes(8),
        );
        let (small, small_report) = small_loader.load_with_report(file.path()).unwrap();

        assert_eq!(big_report.buffer_size as u64, file.as_file().metadata().unwrap().len() + 1);
        assert_eq!(small_report.buffer_size, 24);
        assert!(small_report.buffer_fills > 10);
        assert_eq!(big.len(), 20);
        assert!(big.iter().eq(small.iter()));
    }

    #[test]
    fn test_stray_newlines() {
        let mut with_newlines = b"3 1\n".to_vec();
        with_newlines.extend(record("aa", &[1.0], 0));
        with_newlines.extend(record("bb", &[2.0], 3));
        with_newlines.extend(record("cc", &[-1.0], 1));

        let mut without = b"3 1\n".to_vec();
        without.extend(record("aa", &[1.0], 0));
        without.extend(record("bb", &[2.0], 0));
        without.extend(record("cc", &[-1.0], 0));

        let (a, _) = Loader::default()
            .load_reader(Cursor::new(with_newlines), None)
            .unwrap();
        let (b, _) = Loader::default()
            .load_reader(Cursor::new(without), None)
            .unwrap();

        let words: Vec<&str> = a.words().collect();
        assert_eq!(words, vec!["aa", "bb", "cc"]);
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn test_zero_vectors_skipped() {
        let bytes = w2v("2 2\n", &[("zero", &[0.0, 0.0]), ("ok", &[3.0, 4.0])]);
        let (table, report) = Loader::default()
            .load_reader(Cursor::new(bytes), None)
            .unwrap();

        assert_eq!(report.rejected_vectors, 1);
        assert!(!table.contains("zero"));
        assert_eq!(table.get("ok"), Some(&[0.6f32, 0.8][..]));
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let bytes = w2v(
            "4 3\n",
            &[
                ("one", &[1.0, 2.0, 3.0]),
                ("two", &[-100.0, 0.5, 7.0]),
                ("three", &[1e-3, 1e-3, 1e-3]),
                ("four", &[1e6, -1e6, 3.0]),
            ],
        );
        let (table, _) = Loader::default()
            .load_reader(Cursor::new(bytes), None)
            .unwrap();

        assert_eq!(table.len(), 4);
        for (word, v) in table.iter() {
            assert_eq!(v.len(), 3);
            assert!(is_unit(v, 1e-5), "{} is not unit length", word);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = s1_bytes();
        bytes.extend_from_slice(b"garbage after the last record");
        let (table, report) = Loader::default()
            .load_reader(Cursor::new(bytes), None)
            .unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(table.len(), 2);
    }

    fn load_err(bytes: &[u8]) -> LoadError {
        Loader::default()
            .load_reader(Cursor::new(bytes), None)
            .unwrap_err()
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(load_err(b""), LoadError::MalformedHeader(_)));
        assert!(matches!(load_err(b"3 2"), LoadError::MalformedHeader(_)));
        assert!(matches!(load_err(b"hello world\n"), LoadError::MalformedHeader(_)));
        assert!(matches!(load_err(b"0 2\n"), LoadError::InvalidHeaderValues { .. }));
        assert!(matches!(load_err(b"3 -2\n"), LoadError::InvalidHeaderValues { .. }));
        assert!(matches!(
            load_err(b"4294967295 4294967295\n"),
            LoadError::DimensionOverflow { .. }
        ));
    }

    #[test]
    fn test_minimum_buffer_with_separators() {
        // max_word_bytes + 1 + 4 bytes of vector
        let loader = Loader::new(
            LoaderConfig::default()
                .with_buffer_size(9)
                .with_max_word_bytes(4),
        );
        let mut bytes = b"3 1\n".to_vec();
        bytes.extend(record("abcd", &[1.0], 0));
        bytes.extend(record("efgh", &[-1.0], 1));
        bytes.extend(record("ijkl", &[2.0], 2));

        let (table, report) = loader.load_reader(Cursor::new(bytes), None).unwrap();
        assert_eq!(table.words().collect::<Vec<_>>(), vec!["abcd", "efgh", "ijkl"]);
        assert_eq!(table.get("efgh").unwrap().to_vec(), vec![-1.0]);
        assert_eq!(report.records, 3);
    }

    #[test]
    fn test_buffer_too_small_for_dimension() {
        let loader = Loader::new(LoaderConfig::default().with_buffer_size(16));
        let bytes = w2v("1 4\n", &[("aa", &[1.0, 0.0, 0.0, 0.0])]);

        let err = loader.load_reader(Cursor::new(bytes), None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RecordExceedsBuffer {
                buffer_size: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_word_longer_than_buffer() {
        let loader = Loader::new(
            LoaderConfig::default()
                .with_buffer_size(32)
                .with_max_word_bytes(4),
        );
        let long_word = "w".repeat(40);
        let bytes = w2v("1 2\n", &[(long_word.as_str(), &[1.0, 0.0])]);

        let err = loader.load_reader(Cursor::new(bytes), None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RecordExceedsBuffer {
                needed: 33,
                buffer_size: 32
            }
        ));
    }

    #[test]
    fn test_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.bin");

        let err = load(&missing).unwrap_err();
        match err {
            LoadError::Open { path, .. } => assert_eq!(path, missing),
            other => panic!("expected open error, got {}", other),
        }
    }

    #[test]
    fn test_read_error_propagates() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            }
        }

        let err = Loader::default()
            .load_reader(FailingReader, None)
            .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
