use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tokdawg::index::build::{build_index, BuildConfig};
use tokdawg::index::stats::{arity_census, show_stats};
use tokdawg::index::{IndexKind, TokenStore, Token};
use tokdawg::output::{print_census, print_trace};
use tokdawg::query::{compare_traces, CachedIndex, LoadedIndex, SuffixIndex, TraceOptions};
use tokdawg::server::{serve_stdio, AppContext};
use tokdawg::utils::AppConfig;

#[derive(Parser)]
#[command(name = "tokdawg")]
#[command(about = "Suffix automaton indexes over tokenized corpora")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Dawg,
    Cdawg,
}

impl From<Kind> for IndexKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dawg => IndexKind::Dawg,
            Kind::Cdawg => IndexKind::Cdawg,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a corpus
    Build {
        /// Corpus: one document per line of whitespace-separated token ids
        corpus: PathBuf,

        /// Output file (dawg) or directory (cdawg)
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "cdawg")]
        kind: Kind,

        /// Corpus is a flat little-endian u32 token file
        #[arg(long)]
        raw: bool,

        /// Skip filling occurrence counts
        #[arg(long)]
        no_counts: bool,

        /// Append build statistics to this JSON-lines file
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Tokens between statistics snapshots
        #[arg(long, default_value_t = 0)]
        stats_interval: u64,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },
    /// Stream token ids through an index (reads queries from stdin if none given)
    Query {
        index: PathBuf,

        tokens: Vec<Token>,

        /// Show next-token entropy per position
        #[arg(short, long)]
        entropy: bool,

        /// Show the top K next tokens per position (negative for all)
        #[arg(short, long, num_args = 0..=1, allow_negative_numbers = true)]
        next: Option<Option<i64>>,
    },
    /// Show index statistics
    Stats { index: PathBuf },
    /// Print the out-degree of every reachable node
    Arities {
        index: PathBuf,

        /// Print a histogram instead
        #[arg(long)]
        census: bool,
    },
    /// Compute occurrence counts and store them in the index
    FillCounts { index: PathBuf },
    /// Check that two indexes agree on every prefix of a corpus
    Verify {
        left: PathBuf,
        right: PathBuf,

        /// Corpus to stream (same format as `build`)
        corpus: PathBuf,

        #[arg(long)]
        raw: bool,
    },
    /// Answer JSON-lines requests on stdin
    Serve { index: PathBuf },
}

fn read_corpus(path: &Path, raw: bool) -> Result<TokenStore> {
    if raw {
        TokenStore::read_raw(path)
    } else {
        TokenStore::read_text(path)
    }
}

fn parse_query(line: &str) -> Result<Vec<Token>> {
    line.split_ascii_whitespace()
        .map(|field| {
            field
                .parse()
                .with_context(|| format!("Invalid token id {:?}", field))
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let color = !cli.no_color;

    match cli.command {
        Commands::Build {
            corpus,
            output,
            kind,
            raw,
            no_counts,
            stats,
            stats_interval,
            quiet,
        } => {
            let tokens = read_corpus(&corpus, raw)?;
            let build_config = BuildConfig {
                kind: kind.into(),
                counts: !no_counts,
                stats_path: stats,
                stats_interval,
                show_progress: config.show_progress && !quiet,
            };
            let stats = build_index(&tokens, &output, &build_config)?;
            println!(
                "{} nodes, {} edges over {} tokens ({:.3} nodes/token, {:.3} edges/token) in {:.2}s",
                stats.n_nodes,
                stats.n_edges,
                stats.n_tokens,
                stats.nodes_per_token(),
                stats.edges_per_token(),
                stats.elapsed_secs
            );
        }
        Commands::Query {
            index,
            tokens,
            entropy,
            next,
        } => {
            let index = CachedIndex::new(LoadedIndex::open(&index)?, config.cache_size);
            let options = TraceOptions {
                entropies: entropy,
                next_tokens: next.map(|k| k.unwrap_or(config.top_k)),
            };

            if !tokens.is_empty() {
                print_trace(&tokens, &index.trace(&tokens, &options), color)?;
            } else {
                for line in io::stdin().lock().lines() {
                    let query = parse_query(&line?)?;
                    print_trace(&query, &index.trace(&query, &options), color)?;
                    println!();
                }
            }
        }
        Commands::Stats { index } => {
            show_stats(&index)?;
        }
        Commands::Arities { index, census } => {
            let arities = LoadedIndex::open(&index)?.traverse_arities();
            if census {
                print_census(&arity_census(&arities), color)?;
            } else {
                for arity in arities {
                    println!("{}", arity);
                }
            }
        }
        Commands::FillCounts { index } => {
            let mut loaded = LoadedIndex::open(&index)?;
            if loaded.has_counts() {
                println!("{} already has counts", index.display());
                return Ok(());
            }
            loaded.fill_counts_ram()?;
            loaded.persist_counts()?;
            println!("Counts stored in {}", index.display());
        }
        Commands::Verify {
            left,
            right,
            corpus,
            raw,
        } => {
            let a = LoadedIndex::open(&left)?;
            let b = LoadedIndex::open(&right)?;
            let tokens = read_corpus(&corpus, raw)?;
            match compare_traces(&a, &b, tokens.as_slice()) {
                None => println!("OK: {} tokens agree", tokens.len()),
                Some(mismatch) => bail!("Indexes disagree at {}", mismatch),
            }
        }
        Commands::Serve { index } => {
            let ctx = AppContext::open(&index, config)?;
            serve_stdio(&ctx)?;
            ctx.close();
        }
    }

    Ok(())
}
