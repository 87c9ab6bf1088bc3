//! showtree - Reconcile TV show metadata with a local media directory
//!
//! This library walks a media root laid out as `show/season/video-file`,
//! resolves every show directory against a remote catalog, matches catalog
//! episodes to video files and writes a cross-linked tree of JSON descriptors
//! next to the media.

mod config;
mod descriptor;
mod metadata_retrieval;
mod path_classifier;
mod temp;
mod tree_walker;
mod video_matcher;

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, info_span, warn};

// Re-export error types
pub use config::ConfigError;
pub use descriptor::DescriptorError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use path_classifier::ClassifyError;
pub use tree_walker::WalkError;

// Re-export the building blocks
pub use config::ConjoinConfig;
pub use descriptor::{
    APP_PAGE, DescriptorWriter, EPISODES_INDEX, EpisodeDescriptor, SEASONS_INDEX, SHOWS_INDEX,
    SeasonDescriptor, ShowDescriptor,
};
pub use metadata_retrieval::{
    DEFAULT_TVMAZE_URL, Episode, Image, MetadataProvider, QueryNormalizer, RetryPolicy, Season,
    Show, TvMazeProvider,
};
pub use path_classifier::{PathClass, PathClassifier};
pub use tree_walker::{TreeWalker, WalkSummary};
pub use video_matcher::{
    DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_VIDEO_EXTENSIONS, MatchKind, VideoMatch, VideoMatcher,
    edit_distance, notation_token,
};

/// Progress event emitted during a run
///
/// These events allow library users to track progress and provide feedback
/// while shows are processed. Shows are processed in parallel, so events of
/// different shows interleave.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { root: PathBuf },

    /// Show directories found below the root
    ShowsDiscovered { count: usize },

    /// A show directory was resolved against the catalog
    ShowResolved { directory: PathBuf, title: String },

    /// All descriptors of a show were written
    ShowWritten {
        directory: PathBuf,
        title: String,
        summary: WalkSummary,
    },

    /// A show was left out of the run
    ShowFailed { directory: PathBuf, reason: String },

    /// Run complete, `shows.json` written
    Complete { written: usize, failed: usize },
}

/// Why a single show was left out of the run
#[derive(Debug, Error)]
pub enum ShowError {
    /// The directory name would make `<show>.json` replace the show list
    #[error("Show directory name is reserved: {0}")]
    ReservedName(PathBuf),

    /// The catalog could not resolve the directory
    #[error("Lookup failed: {0}")]
    Lookup(#[from] MetadataRetrievalError),

    /// The show's directory tree could not be processed
    #[error("Walk failed: {0}")]
    Walk(#[from] WalkError),

    /// The show's own descriptor could not be written
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// A show directory that produced no output
#[derive(Debug)]
pub struct ShowFailure {
    pub directory: PathBuf,
    pub error: ShowError,
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunReport {
    /// Shows listed in `shows.json`, in directory-name order
    pub shows: Vec<ShowDescriptor>,
    /// Shows left out, in directory-name order
    pub failures: Vec<ShowFailure>,
}

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum ShowtreeError {
    /// The media root could not be listed
    #[error("Failed to read media root {path}: {source}")]
    ReadRoot { path: PathBuf, source: io::Error },

    /// A viewer app template could not be read
    #[error("Failed to read app template {path}: {source}")]
    ReadApp { path: PathBuf, source: io::Error },

    /// The worker pool could not be started
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The root-level show list could not be written
    #[error("Failed to write show index: {0}")]
    Aggregate(#[source] DescriptorError),

    /// The root viewer app could not be written
    #[error("Failed to write viewer app: {0}")]
    ShowsApp(#[source] DescriptorError),
}

/// Reconciles every show below the configured root and writes the
/// descriptor tree
///
/// Each immediate subdirectory of the root is a show candidate. Its name is
/// normalized and resolved through `provider`, its tree is walked once to
/// write the season and episode descriptors, and finally `<show>.json` is
/// written next to it. Candidates are processed in parallel and
/// independently: a failing show is reported in the returned `RunReport` and
/// through `progress_callback`, and never affects the other shows.
///
/// When app templates are configured, the shows template is copied to
/// `<root>/index.html` and the show template to `<show>/index.html` of every
/// written show.
///
/// The run itself fails only if an app template cannot be read, the root
/// cannot be listed, or the root-level `shows.json` or `index.html` cannot be
/// written.
///
/// # Examples
///
/// ```no_run
/// use showtree::{conjoin_library, ConjoinConfig, DEFAULT_TVMAZE_URL, ProgressEvent, RetryPolicy, TvMazeProvider};
/// use std::path::Path;
///
/// let config = ConjoinConfig::new(Path::new("/srv/media")).unwrap();
/// let provider = TvMazeProvider::new(DEFAULT_TVMAZE_URL, RetryPolicy::default());
///
/// let report = conjoin_library(&config, &provider, |event| {
///     if let ProgressEvent::ShowFailed { directory, reason } = event {
///         eprintln!("{}: {}", directory.display(), reason);
///     }
/// })
/// .unwrap();
/// println!("{} show(s) written", report.shows.len());
/// ```
pub fn conjoin_library<P, F>(
    config: &ConjoinConfig,
    provider: &P,
    progress_callback: F,
) -> Result<RunReport, ShowtreeError>
where
    P: MetadataProvider + Sync + ?Sized,
    F: Fn(ProgressEvent) + Sync,
{
    let root = config.root();
    progress_callback(ProgressEvent::Started {
        root: root.to_path_buf(),
    });

    let shows_app = load_app(config.shows_app())?;
    let show_app = load_app(config.show_app())?;

    let candidates = list_show_directories(root)?;
    info!(root = %root.display(), count = candidates.len(), "discovered show directories");
    progress_callback(ProgressEvent::ShowsDiscovered {
        count: candidates.len(),
    });

    let conjoiner = Conjoiner {
        classifier: PathClassifier::new(root),
        matcher: VideoMatcher::new(config.video_extensions(), config.max_edit_distance()),
        writer: DescriptorWriter::new(root, config.document_root()),
        normalizer: QueryNormalizer::new(config.strip_suffixes().iter().cloned()),
        show_app,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs().unwrap_or(0))
        .build()?;

    // collect keeps the input order, so the index is stable across runs
    let outcomes: Vec<(PathBuf, Result<ShowDescriptor, ShowError>)> = pool.install(|| {
        candidates
            .into_par_iter()
            .map(|directory| {
                let outcome = conjoiner.process_show(&directory, provider, &progress_callback);
                (directory, outcome)
            })
            .collect()
    });

    let mut report = RunReport {
        shows: Vec::new(),
        failures: Vec::new(),
    };

    for (directory, outcome) in outcomes {
        match outcome {
            Ok(show) => report.shows.push(show),
            Err(e) => {
                progress_callback(ProgressEvent::ShowFailed {
                    directory: directory.clone(),
                    reason: e.to_string(),
                });
                report.failures.push(ShowFailure {
                    directory,
                    error: e,
                });
            }
        }
    }

    conjoiner
        .writer
        .write(&report.shows, &root.join(SHOWS_INDEX))
        .map_err(ShowtreeError::Aggregate)?;

    if let Some(app) = &shows_app {
        conjoiner
            .writer
            .write_bytes(app, &descriptor::app_location(root))
            .map_err(ShowtreeError::ShowsApp)?;
    }

    info!(
        written = report.shows.len(),
        failed = report.failures.len(),
        "show index written to disk"
    );
    progress_callback(ProgressEvent::Complete {
        written: report.shows.len(),
        failed: report.failures.len(),
    });

    Ok(report)
}

/// Reads an app template up front so a bad path fails before any output
fn load_app(template: Option<&Path>) -> Result<Option<Vec<u8>>, ShowtreeError> {
    template
        .map(|path| {
            fs::read(path).map_err(|source| ShowtreeError::ReadApp {
                path: path.to_path_buf(),
                source,
            })
        })
        .transpose()
}

/// Immediate subdirectories of `root` with UTF-8 names, sorted by name
fn list_show_directories(root: &Path) -> Result<Vec<PathBuf>, ShowtreeError> {
    let read_root = |source| ShowtreeError::ReadRoot {
        path: root.to_path_buf(),
        source,
    };

    let mut directories = Vec::new();
    for entry in fs::read_dir(root).map_err(read_root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to read directory entry, skipping");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_none() {
            warn!(path = %path.display(), "show directory name is not valid UTF-8, skipping");
            continue;
        }
        directories.push(path);
    }

    directories.sort();
    Ok(directories)
}

/// Per-run components shared by all show workers
struct Conjoiner {
    classifier: PathClassifier,
    matcher: VideoMatcher,
    writer: DescriptorWriter,
    normalizer: QueryNormalizer,
    show_app: Option<Vec<u8>>,
}

impl Conjoiner {
    /// Resolves, walks and indexes a single show directory
    fn process_show<P, F>(
        &self,
        directory: &Path,
        provider: &P,
        progress_callback: &F,
    ) -> Result<ShowDescriptor, ShowError>
    where
        P: MetadataProvider + ?Sized,
        F: Fn(ProgressEvent),
    {
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let span = info_span!("show", directory = %name);
        let _enter = span.enter();

        if descriptor::is_reserved_show_name(&name) {
            warn!("show directory name clashes with {}, excluding it", SHOWS_INDEX);
            return Err(ShowError::ReservedName(directory.to_path_buf()));
        }

        let query = self.normalizer.normalize(&name);
        let show = provider.fetch_show(&query).inspect_err(|e| {
            warn!(query = %query, error = %e, "unable to resolve show, excluding it");
        })?;

        info!(show = %show.name, id = show.id, "matched directory with show");
        progress_callback(ProgressEvent::ShowResolved {
            directory: directory.to_path_buf(),
            title: show.name.clone(),
        });

        let walker = TreeWalker::new(&self.classifier, &self.matcher, &self.writer);
        let summary = walker.walk(directory, &show).inspect_err(|e| {
            error!(
                show = %show.name,
                path = %directory.display(),
                inconsistent = e.is_tree_inconsistency(),
                error = %e,
                "failed to write show tree"
            );
        })?;

        if let Some(app) = &self.show_app {
            let location = descriptor::app_location(directory);
            self.writer.write_bytes(app, &location).inspect_err(|e| {
                error!(
                    show = %show.name,
                    path = %location.display(),
                    error = %e,
                    "failed to write show app"
                );
            })?;
        }

        let location = descriptor::show_location(self.writer.root(), directory);
        let descriptor = ShowDescriptor::new(
            &show,
            self.writer.url_for(&location)?,
            self.writer
                .url_for(&descriptor::seasons_list_location(directory))?,
        );
        self.writer.write(&descriptor, &location).inspect_err(|e| {
            error!(
                show = %show.name,
                path = %location.display(),
                error = %e,
                "failed to write show descriptor"
            );
        })?;

        info!(
            show = %show.name,
            seasons = summary.seasons,
            episodes = summary.episodes,
            videos = summary.videos,
            "show written to disk"
        );
        progress_callback(ProgressEvent::ShowWritten {
            directory: directory.to_path_buf(),
            title: show.name.clone(),
            summary,
        });

        Ok(descriptor)
    }
}
