//! Run configuration
//!
//! Everything a run needs to know is gathered here once and handed to the
//! components that need it.

use crate::video_matcher::{DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_VIDEO_EXTENSIONS};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while setting up a run
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The media root could not be resolved
    #[error("Failed to resolve media root {path}: {source}")]
    InvalidRoot { path: PathBuf, source: io::Error },

    /// The media root is not a directory
    #[error("Media root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Settings for one reconciliation run
#[derive(Debug, Clone)]
pub struct ConjoinConfig {
    root: PathBuf,
    document_root: String,
    video_extensions: Vec<String>,
    max_edit_distance: usize,
    strip_suffixes: Vec<String>,
    jobs: Option<usize>,
    shows_app: Option<PathBuf>,
    show_app: Option<PathBuf>,
}

impl ConjoinConfig {
    /// Creates a configuration with defaults for the media root at `root`.
    ///
    /// The root is resolved to its canonical absolute form, so it has to
    /// exist and be a directory.
    pub fn new(root: &Path) -> Result<Self, ConfigError> {
        let resolved = root
            .canonicalize()
            .map_err(|source| ConfigError::InvalidRoot {
                path: root.to_path_buf(),
                source,
            })?;

        if !resolved.is_dir() {
            return Err(ConfigError::NotADirectory(resolved));
        }

        Ok(Self {
            root: resolved,
            document_root: String::new(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_edit_distance: DEFAULT_MAX_EDIT_DISTANCE,
            strip_suffixes: Vec::new(),
            jobs: None,
            shows_app: None,
            show_app: None,
        })
    }

    /// Prefix prepended verbatim to every emitted URL.
    pub fn with_document_root(mut self, document_root: impl Into<String>) -> Self {
        self.document_root = document_root.into();
        self
    }

    /// Extensions of files considered videos. An empty list keeps the
    /// defaults.
    pub fn with_video_extensions(mut self, extensions: Vec<String>) -> Self {
        if !extensions.is_empty() {
            self.video_extensions = extensions;
        }
        self
    }

    pub fn with_max_edit_distance(mut self, max_edit_distance: usize) -> Self {
        self.max_edit_distance = max_edit_distance;
        self
    }

    /// Suffixes stripped from directory names before searching the catalog.
    pub fn with_strip_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.strip_suffixes = suffixes;
        self
    }

    /// Number of shows processed in parallel; `None` uses one worker per CPU.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|&j| j > 0);
        self
    }

    /// Viewer page copied to `<root>/index.html`.
    pub fn with_shows_app(mut self, template: Option<PathBuf>) -> Self {
        self.shows_app = template;
        self
    }

    /// Viewer page copied to `<show>/index.html` for every written show.
    pub fn with_show_app(mut self, template: Option<PathBuf>) -> Self {
        self.show_app = template;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn video_extensions(&self) -> &[String] {
        &self.video_extensions
    }

    pub fn max_edit_distance(&self) -> usize {
        self.max_edit_distance
    }

    pub fn strip_suffixes(&self) -> &[String] {
        &self.strip_suffixes
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    pub fn shows_app(&self) -> Option<&Path> {
        self.shows_app.as_deref()
    }

    pub fn show_app(&self) -> Option<&Path> {
        self.show_app.as_deref()
    }
}
