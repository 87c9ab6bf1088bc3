use anyhow::Context;
use clap::Parser;
use showtree::{
    ConjoinConfig, DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_TVMAZE_URL, ProgressEvent, RetryPolicy,
    TvMazeProvider, conjoin_library,
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Reconcile TV show metadata with a local media directory and write a
/// cross-linked tree of JSON descriptors next to the media.
#[derive(Debug, Parser)]
#[command(name = "showtree", version, about)]
struct Cli {
    /// Media root: one directory per show, one directory per season below it
    root: PathBuf,

    /// Prefix prepended to every URL in the descriptors
    #[arg(long, value_name = "PREFIX", default_value = "")]
    document_root: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Video file extension to consider (repeatable) [default: mp4, mkv, avi]
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Largest edit distance between episode title and file name that still matches
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_EDIT_DISTANCE)]
    max_edit_distance: usize,

    /// Suffix stripped from show directory names before searching (repeatable)
    #[arg(long = "strip-suffix", value_name = "SUFFIX", default_value = " (US)")]
    strip_suffixes: Vec<String>,

    /// Number of shows processed in parallel [default: number of CPUs]
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,

    /// Attempts per catalog request
    #[arg(long, value_name = "N", default_value_t = 3)]
    retries: u32,

    /// Pause between catalog request attempts, growing with each attempt
    #[arg(long, value_name = "MS", default_value_t = 0)]
    retry_delay_ms: u64,

    /// HTML page copied to ROOT/index.html
    #[arg(long, value_name = "FILE")]
    shows_app: Option<PathBuf>,

    /// HTML page copied to index.html in every show directory
    #[arg(long, value_name = "FILE")]
    show_app: Option<PathBuf>,

    /// Base URL of the TVMaze API
    #[arg(long, value_name = "URL", env = "TVMAZE_URL", default_value = DEFAULT_TVMAZE_URL)]
    tvmaze_url: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { root } => {
            println!("Reconciling shows in {}...", root.display());
        }
        ProgressEvent::ShowsDiscovered { count } => {
            println!("Found {} show director{}\n", count, if count == 1 { "y" } else { "ies" });
        }
        ProgressEvent::ShowResolved { directory, title } => {
            println!("  {} -> {}", directory.display(), title);
        }
        ProgressEvent::ShowWritten { title, summary, .. } => {
            println!(
                "  {}: {} season(s), {} episode(s), {} with video",
                title, summary.seasons, summary.episodes, summary.videos
            );
        }
        ProgressEvent::ShowFailed { directory, reason } => {
            println!("  {} skipped: {}", directory.display(), reason);
        }
        ProgressEvent::Complete { written, failed } => {
            println!("\nDone. Wrote {} show(s), skipped {}.", written, failed);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConjoinConfig::new(&cli.root)
        .context("Error initializing run")?
        .with_document_root(cli.document_root)
        .with_video_extensions(cli.extensions)
        .with_max_edit_distance(cli.max_edit_distance)
        .with_strip_suffixes(cli.strip_suffixes)
        .with_jobs(cli.jobs)
        .with_shows_app(cli.shows_app)
        .with_show_app(cli.show_app);

    let retry = RetryPolicy::new(cli.retries, Duration::from_millis(cli.retry_delay_ms));
    let provider = TvMazeProvider::new(cli.tvmaze_url, retry);

    conjoin_library(&config, &provider, handle_progress_event)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli) {
        error!("run failed: {:#}", e);
        process::exit(1);
    }
}
