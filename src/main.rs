//! # MDS Harness CLI (`mds`)
//!
//! The `mds` binary builds the taxonomy from the reference site and
//! classifies queries against it.
//!
//! ## Usage
//!
//! ```bash
//! mds --config ./config/mds.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mds build` | Crawl the reference site and write the sorted taxonomy |
//! | `mds classify "<query>"` | Classify a query, one JSON update per line |
//! | `mds documents` | Export breadcrumb documents as JSON lines |
//! | `mds stats` | Show taxonomy statistics and invariant checks |
//! | `mds completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Crawl with 8 concurrent fetches and JSON progress on stderr
//! mds build --concurrency 8 --progress json
//!
//! # Classify against a local Ollama model
//! mds classify "sourdough bread" --config ./config/ollama.toml
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mds_harness::builder::TreeBuilder;
use mds_harness::classify::Classifier;
use mds_harness::config::{self, Config, MAX_CONCURRENCY};
use mds_harness::documents::{tree_documents, write_documents};
use mds_harness::oracle::create_oracle;
use mds_harness::persist::{load_tree, persist};
use mds_harness::progress::ProgressMode;
use mds_harness::source::HttpPageSource;
use mds_harness::stats::TreeStats;

/// Longest accepted classification query, in characters.
const MAX_QUERY_CHARS: usize = 500;

/// MDS Harness CLI: build a decimal taxonomy and classify queries
/// against it.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "mds",
    about = "Build a Melvil decimal taxonomy and classify queries against it",
    version,
    long_about = "MDS Harness crawls the Melvil decimal system listing pages into a sorted \
    JSON taxonomy, then classifies free-text queries by asking a language model to choose \
    one class per level, streaming each step as it is decided."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mds.toml`. Tree paths, crawler and oracle
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/mds.toml")]
    config: PathBuf,

    /// Log at debug level (ignored when `RUST_LOG` is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Crawl the reference site and persist the taxonomy.
    ///
    /// Writes the sorted tree to `[tree].path`. Ctrl+C stops the crawl and
    /// writes whatever was assembled so far to `[tree].snapshot_path`.
    Build {
        /// Write the finished tree here instead of `[tree].path`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override `[crawler].concurrency`.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Progress on stderr: `human`, `json` or `off`. Defaults to
        /// `human` when stderr is a terminal.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// Classify a query against the persisted taxonomy.
    ///
    /// Prints one JSON object per level (`breadcrumb`, `name`, `number`,
    /// `finished`) as soon as the oracle has decided it.
    Classify {
        /// Free-text query (1 to 500 characters).
        query: String,
    },

    /// Export one breadcrumb document per class as JSON lines.
    Documents {
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show taxonomy statistics and invariant checks.
    Stats,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

/// Parse a `--progress` value.
fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("invalid progress mode '{}': use human, json or off", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "mds", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build {
            output,
            concurrency,
            progress,
        } => {
            run_build(&cfg, output, concurrency, progress).await?;
        }
        Commands::Classify { query } => {
            run_classify(&cfg, &query).await?;
        }
        Commands::Documents { output } => {
            run_documents(&cfg, output.as_deref())?;
        }
        Commands::Stats => {
            run_stats(&cfg)?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run_build(
    cfg: &Config,
    output: Option<PathBuf>,
    concurrency: Option<usize>,
    progress: Option<ProgressMode>,
) -> Result<()> {
    let concurrency = concurrency.unwrap_or(cfg.crawler.concurrency);
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        bail!("--concurrency must be in 1..={}", MAX_CONCURRENCY);
    }
    let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);

    let source = Arc::new(HttpPageSource::new(&cfg.crawler)?);
    let builder = TreeBuilder::new(source)
        .with_concurrency(concurrency)
        .with_progress(progress.reporter());

    let mut report = builder.build_until(shutdown_signal()).await;

    let path = if report.interrupted {
        cfg.tree.snapshot_path.clone()
    } else {
        output.unwrap_or_else(|| cfg.tree.path.clone())
    };
    let count = persist(&mut report.tree, &path)?;

    if report.interrupted {
        println!("Build interrupted.");
        println!("  snapshot: {} ({} nodes)", path.display(), count);
    } else {
        println!("Build complete.");
        println!("  taxonomy: {} ({} nodes)", path.display(), count);
    }
    println!("  pages fetched: {}", report.fetched);
    println!("  pages failed: {}", report.failed_paths.len());
    println!("  unattachable rows: {}", report.unattachable.len());

    Ok(())
}

/// Trim and lower-case a query, enforcing the length limit.
fn normalize_query(query: &str) -> Result<String> {
    let query = query.trim().to_lowercase();
    let len = query.chars().count();
    if len == 0 || len > MAX_QUERY_CHARS {
        bail!("query must be 1 to {} characters", MAX_QUERY_CHARS);
    }
    Ok(query)
}

async fn run_classify(cfg: &Config, query: &str) -> Result<()> {
    let query = normalize_query(query)?;
    if !cfg.oracle.is_enabled() {
        bail!("Oracle provider is disabled; set [oracle].provider to openai or ollama");
    }
    let tree = load_tree(&cfg.tree.path)?;
    let oracle = create_oracle(&cfg.oracle)?;
    let classifier = Classifier::new(tree, oracle);

    let mut descent = classifier.classify(&query);
    let stdout = std::io::stdout();
    while let Some(update) = descent.next().await {
        let update = update?;
        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &update)?;
        writeln!(out)?;
        out.flush()?;
    }

    Ok(())
}

fn run_documents(cfg: &Config, output: Option<&Path>) -> Result<()> {
    let tree = load_tree(&cfg.tree.path)?;
    let documents = tree_documents(&tree);

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let count = write_documents(&documents, std::io::BufWriter::new(file))?;
            println!("Wrote {} documents to {}", count, path.display());
        }
        None => {
            write_documents(&documents, std::io::stdout().lock())?;
        }
    }

    Ok(())
}

fn run_stats(cfg: &Config) -> Result<()> {
    let tree = load_tree(&cfg.tree.path)?;
    TreeStats::collect(&tree).print(&cfg.tree.path.display().to_string());
    Ok(())
}
