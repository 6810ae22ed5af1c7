//! wordvec Corpus Statistics
//!
//! Loads a word2vec binary file and prints word-length statistics, to see
//! whether the file carries junk tokens worth filtering.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wordvec::{format_elapsed, CorpusStats, Loader, LoaderConfig};

/// wordvec-stats - word-length statistics for a word2vec file
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// word2vec binary file (e.g. vectors.bin)
    file: PathBuf,

    /// Shortest word to keep, in bytes (0 keeps every token)
    #[arg(long, default_value_t = 0)]
    min_word_len: usize,

    /// Read buffer size in MiB
    #[arg(long, default_value_t = 64)]
    buffer_mb: usize,

    /// Print every one-character word
    #[arg(long)]
    list_short: bool,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wordvec=info".parse()?))
        .init();

    let args = Args::parse();
    let config = LoaderConfig::default()
        .with_buffer_size(args.buffer_mb.saturating_mul(1024 * 1024))
        .with_min_word_len(args.min_word_len);

    info!("Reading {}", args.file.display());
    let (table, report) = Loader::new(config).load_with_report(&args.file)?;
    info!(
        "Read {} records in {} ({} duplicates, {} zero vectors)",
        report.records,
        format_elapsed(report.elapsed),
        report.duplicates,
        report.rejected_vectors
    );

    if args.list_short {
        for word in CorpusStats::one_char_words(&table) {
            println!("1char word {}", word);
        }
    }

    println!("{}", CorpusStats::from_table(&table));
    Ok(())
}
