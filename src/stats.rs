//! Corpus Statistics
//!
//! Word-length statistics over a loaded table, for spotting junk tokens
//! (empty words, stray punctuation, lone digits) in an embedding file.

use std::fmt;

use crate::vector::EmbeddingTable;

/// Word-length statistics for a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusStats {
    pub words: usize,
    pub zero_length: usize,
    pub one_char: usize,
    /// One-character words that are not letters or digits
    pub punctuation: usize,
    /// One-character words that are digits
    pub digits: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub mean_len: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl CorpusStats {
    /// Compute statistics over every word of `table`
    ///
    /// Lengths are counted in characters.
    pub fn from_table(table: &EmbeddingTable) -> Self {
        Self::from_words(table.words())
    }

    pub fn from_words<'a, I>(words: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut stats = Self::default();
        let mut lens = Vec::new();

        for word in words {
            let len = word.chars().count();
            lens.push(len);
            match len {
                0 => stats.zero_length += 1,
                1 => {
                    stats.one_char += 1;
                    if let Some(c) = word.chars().next() {
                        if !c.is_alphanumeric() {
                            stats.punctuation += 1;
                        }
                        if c.is_numeric() {
                            stats.digits += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        stats.words = lens.len();
        if lens.is_empty() {
            return stats;
        }

        stats.min_len = lens.iter().copied().min().unwrap_or(0);
        stats.max_len = lens.iter().copied().max().unwrap_or(0);
        let n = lens.len() as f64;
        stats.mean_len = lens.iter().sum::<usize>() as f64 / n;
        stats.variance = lens
            .iter()
            .map(|&len| (len as f64 - stats.mean_len).powi(2))
            .sum::<f64>()
            / n;
        stats.std_dev = stats.variance.sqrt();
        stats
    }

    /// One-character words of a table, in table order
    pub fn one_char_words(table: &EmbeddingTable) -> Vec<&str> {
        table.words().filter(|w| w.chars().count() == 1).collect()
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "list size = {}", self.words)?;
        writeln!(f, "zero length words = {}", self.zero_length)?;
        writeln!(f, "one char words = {}", self.one_char)?;
        writeln!(f, "punctuation words = {}", self.punctuation)?;
        writeln!(f, "digit words = {}", self.digits)?;
        writeln!(f, "min word len = {}", self.min_len)?;
        writeln!(f, "max word len = {}", self.max_len)?;
        writeln!(f, "mean word len = {:.4}", self.mean_len)?;
        writeln!(f, "word len variance = {:.4}", self.variance)?;
        write!(f, "word len std deviation = {:.4}", self.std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = CorpusStats::from_words(["a", "7", ",", "dog", "horse", "\u{e9}t\u{e9}"]);

        assert_eq!(stats.words, 6);
        assert_eq!(stats.zero_length, 0);
        assert_eq!(stats.one_char, 3);
        assert_eq!(stats.punctuation, 1);
        assert_eq!(stats.digits, 1);
        assert_eq!(stats.min_len, 1);
        assert_eq!(stats.max_len, 5);
        // (1 + 1 + 1 + 3 + 5 + 3) / 6
        assert!((stats.mean_len - 14.0 / 6.0).abs() < 1e-12);
        assert!((stats.std_dev * stats.std_dev - stats.variance).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        let stats = CorpusStats::from_words(std::iter::empty());
        assert_eq!(stats, CorpusStats::default());
    }

    #[test]
    fn test_from_table() {
        let table = EmbeddingTable::from_rows(
            1,
            vec![("x", vec![1.0]), ("yy", vec![1.0]), ("?", vec![-1.0])],
        );
        let stats = CorpusStats::from_table(&table);
        assert_eq!(stats.words, 3);
        assert_eq!(stats.one_char, 2);
        assert_eq!(CorpusStats::one_char_words(&table), vec!["x", "?"]);

        let text = stats.to_string();
        assert!(text.starts_with("list size = 3\n"));
        assert!(text.contains("punctuation words = 1"));
    }
}
