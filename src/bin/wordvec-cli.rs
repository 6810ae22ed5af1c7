//! wordvec CLI
//!
//! Loads a word2vec binary file and answers nearest-word and analogy
//! queries read from stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wordvec::{format_elapsed, format_hits, Loader, LoaderConfig, Metrics, SimilarityEngine};

/// wordvec CLI - word2vec nearest words and analogies
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// word2vec binary file (e.g. vectors.bin)
    file: PathBuf,

    /// Read buffer size in MiB
    #[arg(long, default_value_t = 64)]
    buffer_mb: usize,

    /// Shortest word to keep, in bytes
    #[arg(long, default_value_t = 2)]
    min_word_len: usize,

    /// Number of results when a query does not give one
    #[arg(short = 'n', long, default_value_t = 20)]
    top: usize,
}

/// A parsed shell command
#[derive(Debug, PartialEq)]
enum Query {
    Nearest { word: String, k: usize },
    Analogy { a: String, b: String, c: String, k: usize },
    Info,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wordvec=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = LoaderConfig::default()
        .with_buffer_size(args.buffer_mb.saturating_mul(1024 * 1024))
        .with_min_word_len(args.min_word_len);

    let metrics = Metrics::new();
    let (table, report) = {
        let _timer = metrics.time("LOADER");
        Loader::new(config).load_with_report(&args.file)?
    };
    info!(
        "Loaded {} words of dimension {} from {} in {}",
        report.inserted,
        report.dimension,
        args.file.display(),
        format_elapsed(report.elapsed)
    );

    let engine = SimilarityEngine::with_table(table);

    println!("Ready. Type 'help' for available commands, 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("wordvec> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input, args.top) {
            Ok(Query::Nearest { word, k }) => {
                let _timer = metrics.time("MATCHES");
                match engine.nearest(&word, k) {
                    Ok(hits) => println!("{} = {}", word, format_hits(&hits)),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Ok(Query::Analogy { a, b, c, k }) => {
                let _timer = metrics.time("ANALOGY");
                match engine.analogy(&a, &b, &c, k) {
                    Ok(hits) => println!("{} {} {} = {}", a, b, c, format_hits(&hits)),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Ok(Query::Info) => {
                println!("{:#?}", report);
                println!("{}", metrics.summary());
            }
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }

    info!("{}", metrics.summary());
    Ok(())
}

fn parse_command(input: &str, default_k: usize) -> anyhow::Result<Query> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    if parts.is_empty() {
        anyhow::bail!("Empty command");
    }

    let cmd = parts[0].to_uppercase();

    match cmd.as_str() {
        "NEAREST" => {
            if parts.len() < 2 {
                anyhow::bail!("NEAREST requires a word: NEAREST <word> [k]");
            }
            Ok(Query::Nearest {
                word: parts[1].to_string(),
                k: parse_k(parts.get(2), default_k)?,
            })
        }

        "ANALOGY" => {
            if parts.len() < 4 {
                anyhow::bail!("ANALOGY requires three words: ANALOGY <a> <b> <c> [k]");
            }
            Ok(Query::Analogy {
                a: parts[1].to_string(),
                b: parts[2].to_string(),
                c: parts[3].to_string(),
                k: parse_k(parts.get(4), default_k)?,
            })
        }

        "INFO" => Ok(Query::Info),

        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", cmd),
    }
}

fn parse_k(token: Option<&&str>, default_k: usize) -> anyhow::Result<usize> {
    match token {
        Some(t) => Ok(t.parse::<usize>()?),
        None => Ok(default_k),
    }
}

fn print_help() {
    println!(
        r#"
Available commands:

  NEAREST <word> [k]          - The k words closest to <word>
  ANALOGY <a> <b> <c> [k]     - The k words closest to b - a + c
                                ("a is to b as c is to ...?")
  INFO                        - Load report and query timings

  help                        - Show this help
  quit / exit                 - Exit the CLI

Examples:
  NEAREST scratched 20
  ANALOGY dog bone cat
  ANALOGY man king woman 5
"#
    );
}
