//! CLI entry point for the Lumen retrieval engine (for dev and testing).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lumen_core::{
    app_data_dir, get_index_dir, load_config, set_index_dir, Config, IndexSettings,
    Metadata, RagIndex, SearchOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Lumen: local TF-IDF retrieval for prompt context")]
struct Cli {
    /// Index directory (overrides config).
    #[arg(long, global = true, value_name = "DIR")]
    index_dir: Option<PathBuf>,
    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show index statistics.
    Stats,
    /// Show where Lumen stores its config and index (app data directory).
    DataDir,
    /// Print the effective config.
    Config,
    /// Save the index directory to the config (created if missing).
    SetIndexDir {
        #[arg(value_name = "DIR")]
        path: PathBuf,
    },
    /// Index a file, or every supported file under a directory.
    Index {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Maximum directory depth.
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Index raw text under a source tag.
    IndexText {
        #[arg(long)]
        source: String,
        text: String,
    },
    /// Remove a file's chunks from the index.
    Remove {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Empty the index.
    Clear,
    /// Rank indexed chunks against a query.
    Search {
        query: String,
        #[command(flatten)]
        opts: SearchArgs,
    },
    /// Print the prompt context block for a query.
    Context {
        query: String,
        #[command(flatten)]
        opts: SearchArgs,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
    #[arg(long)]
    min_score: Option<f64>,
    /// Only chunks whose source contains this text.
    #[arg(long)]
    source: Option<String>,
}

impl SearchArgs {
    fn apply(self, defaults: &SearchOptions) -> SearchOptions {
        SearchOptions {
            top_k: self.top_k.unwrap_or(defaults.top_k),
            min_score: self.min_score.unwrap_or(defaults.min_score),
            source_filter: self.source,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();
    let json = cli.json;
    let index_dir = cli.index_dir;

    match cli.command.unwrap_or(Commands::Stats) {
        Commands::DataDir => match app_data_dir() {
            Some(p) => {
                println!("{}", p.display());
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("Could not determine app data directory.");
                ExitCode::FAILURE
            }
        },
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(s) => {
                print!("{s}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        Commands::SetIndexDir { path } => match set_index_dir(&path) {
            Ok(dir) => {
                println!("Index directory set to {}", dir.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        Commands::Stats => with_index(index_dir, &config, |index| {
            let stats = index.stats();
            if json {
                print_json(&stats);
            } else {
                println!("Lumen index");
                println!("  chunks:     {}", stats.total_chunks);
                println!("  sources:    {}", stats.total_sources);
                println!("  documents:  {}", stats.total_documents);
                println!("  vocabulary: {}", stats.vocabulary_size);
                for s in &stats.sources {
                    println!("    {s}");
                }
            }
            ExitCode::SUCCESS
        }),
        Commands::Index { path, depth } => with_index(index_dir, &config, |index| {
            if path.is_dir() {
                match index.index_directory(&path, depth) {
                    Ok(report) if json => print_json(&report),
                    Ok(report) => {
                        println!(
                            "Indexed {} file(s) into {} chunk(s), skipped {}",
                            report.indexed, report.chunks, report.skipped
                        );
                        for e in &report.errors {
                            eprintln!("  error: {e}");
                        }
                    }
                    Err(e) => return fail(e),
                }
            } else {
                match index.index_file(&path, &Metadata::new()) {
                    Ok(n) => println!("Indexed {} into {n} chunk(s)", path.display()),
                    Err(e) => return fail(e),
                }
            }
            ExitCode::SUCCESS
        }),
        Commands::IndexText { source, text } => with_index(index_dir, &config, |index| {
            let n = index.index_text(&text, &source, &Metadata::new());
            println!("Indexed {n} chunk(s) under '{source}'");
            ExitCode::SUCCESS
        }),
        Commands::Remove { path } => with_index(index_dir, &config, |index| {
            if index.remove_file(&path) {
                println!("Removed {}", path.display());
            } else {
                println!("Nothing indexed for {}", path.display());
            }
            ExitCode::SUCCESS
        }),
        Commands::Clear => with_index(index_dir, &config, |index| {
            index.clear();
            println!("Index cleared");
            ExitCode::SUCCESS
        }),
        Commands::Search { query, opts } => with_index(index_dir, &config, |index| {
            let results = index.search(&query, &opts.apply(&index.settings().search));
            if json {
                print_json(&results);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for r in results {
                    let preview: String = r.text.chars().take(80).collect();
                    println!("{:.3}  {}  {}", r.score, r.source, preview.replace('\n', " "));
                }
            }
            ExitCode::SUCCESS
        }),
        Commands::Context { query, opts } => with_index(index_dir, &config, |index| {
            let ctx = index.get_context(&query, &opts.apply(&index.settings().search));
            if ctx.is_empty() {
                eprintln!("No relevant context.");
            } else {
                println!("{ctx}");
            }
            ExitCode::SUCCESS
        }),
    }
}

/// Open the index in `--index-dir`, else the configured directory, and run `f` on it.
fn with_index(
    index_dir: Option<PathBuf>,
    config: &Config,
    f: impl FnOnce(RagIndex) -> ExitCode,
) -> ExitCode {
    let dir = match index_dir.map(Ok).unwrap_or_else(|| get_index_dir(config)) {
        Ok(dir) => dir,
        Err(e) => return fail(e),
    };
    f(RagIndex::open(dir, IndexSettings::from(config)))
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    eprintln!("Error: {e}");
    ExitCode::FAILURE
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
