//! Loader Configuration

/// Largest byte count a single `read(2)` call transfers on Linux
pub const MAX_READ_SIZE: usize = 0x7fff_f000;

/// Loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Read buffer size in bytes
    pub buffer_size: usize,

    /// Longest word, in bytes, the buffer must be able to hold next to a vector
    pub max_word_bytes: usize,

    /// Shortest accepted word, in bytes (shorter words are read and dropped)
    pub min_word_len: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024 * 1024, // 64 MiB
            max_word_bytes: 1024,
            min_word_len: 2,
        }
    }
}

impl LoaderConfig {
    /// Set the read buffer size
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Set the longest word a record may carry, in bytes
    pub fn with_max_word_bytes(mut self, bytes: usize) -> Self {
        self.max_word_bytes = bytes;
        self
    }

    /// Set the shortest accepted word length
    pub fn with_min_word_len(mut self, len: usize) -> Self {
        self.min_word_len = len;
        self
    }

    /// Buffer size actually allocated for a source of `source_len` bytes
    ///
    /// Never more than the platform read limit, and never more than one
    /// byte past the whole source.
    pub fn effective_buffer_size(&self, source_len: Option<u64>) -> usize {
        let mut size = self.buffer_size.clamp(1, MAX_READ_SIZE);
        if let Some(len) = source_len {
            let whole = usize::try_from(len.saturating_add(1)).unwrap_or(usize::MAX);
            size = size.min(whole);
        }
        size
    }
}
