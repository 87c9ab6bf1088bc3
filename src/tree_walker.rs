//! Walking a show directory and writing its descriptors
//!
//! A single depth-first traversal visits every directory below a show. The
//! show directory itself produces the season descriptors, each season
//! directory produces the episode descriptors of that season.

use crate::descriptor::{
    DescriptorError, DescriptorWriter, EpisodeDescriptor, SeasonDescriptor, episode_file_names,
    episode_location, episodes_list_location, season_directory, season_location, seasons_list_location,
};
use crate::metadata_retrieval::Show;
use crate::path_classifier::{ClassifyError, PathClass, PathClassifier};
use crate::video_matcher::VideoMatcher;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Errors that abort the walk of a single show
#[derive(Debug, Error)]
pub enum WalkError {
    /// The directory tree could not be traversed
    #[error("Failed to traverse {path}: {source}")]
    TraverseFailed {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// A visited path could not be classified
    #[error("Failed to classify path: {0}")]
    Classify(#[from] ClassifyError),

    /// A season-level directory whose name is not a season number
    #[error("Season directory name is not a season number: {0}")]
    InvalidSeasonDirectory(PathBuf),

    /// A season directory with no counterpart in the catalog
    #[error("Season {season} of '{show}' is not known to the catalog")]
    SeasonNotFound { show: String, season: usize },

    /// A descriptor could not be written
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl WalkError {
    /// Whether the on-disk tree disagrees with the catalog, as opposed to an
    /// I/O problem.
    pub fn is_tree_inconsistency(&self) -> bool {
        matches!(
            self,
            WalkError::InvalidSeasonDirectory(_) | WalkError::SeasonNotFound { .. }
        )
    }
}

/// What a successful walk wrote
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Season descriptors written
    pub seasons: usize,
    /// Episode descriptors written
    pub episodes: usize,
    /// Episodes that got a video URL
    pub videos: usize,
}

/// Parses a season directory name.
///
/// Only the plain decimal form is accepted (`"1"`, not `"01"`), since that is
/// the form the season descriptors point to.
pub fn parse_season_number(name: &str) -> Option<usize> {
    let number: usize = name.parse().ok()?;
    (number.to_string() == name).then_some(number)
}

/// Traverses show directories and writes their descriptors
pub struct TreeWalker<'a> {
    classifier: &'a PathClassifier,
    matcher: &'a VideoMatcher,
    writer: &'a DescriptorWriter,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        classifier: &'a PathClassifier,
        matcher: &'a VideoMatcher,
        writer: &'a DescriptorWriter,
    ) -> Self {
        Self {
            classifier,
            matcher,
            writer,
        }
    }

    /// Walks `show_dir` once and writes every season and episode descriptor
    /// of `show` that has a counterpart on disk.
    ///
    /// The first error aborts the walk; descriptors written so far stay.
    pub fn walk(&self, show_dir: &Path, show: &Show) -> Result<WalkSummary, WalkError> {
        let mut summary = WalkSummary::default();

        let entries = WalkDir::new(show_dir)
            .follow_links(true)
            .sort_by_file_name();

        for entry in entries {
            let entry = entry.map_err(|source| WalkError::TraverseFailed {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| show_dir.to_path_buf()),
                source,
            })?;

            if !entry.file_type().is_dir() {
                continue;
            }

            match self.classifier.classify(entry.path())? {
                PathClass::ShowRoot => self.write_seasons(entry.path(), show, &mut summary)?,
                PathClass::SeasonRoot => self.write_episodes(entry.path(), show, &mut summary)?,
                PathClass::Other => {}
            }
        }

        Ok(summary)
    }

    /// Writes `<show>/<n>.json` for every season present on disk, then
    /// `<show>/seasons.json`.
    fn write_seasons(
        &self,
        show_dir: &Path,
        show: &Show,
        summary: &mut WalkSummary,
    ) -> Result<(), WalkError> {
        let mut seasons = Vec::with_capacity(show.seasons.len());

        for season in &show.seasons {
            let season_dir = season_directory(show_dir, season.season_number);
            if !season_dir.is_dir() {
                info!(
                    show = %show.name,
                    season = season.season_number,
                    path = %season_dir.display(),
                    "season not found on disk, skipping"
                );
                continue;
            }

            let location = season_location(show_dir, season.season_number);
            let descriptor = SeasonDescriptor {
                number: season.season_number,
                url: self.writer.url_for(&location)?,
                episodes_url: self.writer.url_for(&episodes_list_location(&season_dir))?,
            };

            self.writer.write(&descriptor, &location)?;
            seasons.push(descriptor);
        }

        self.writer
            .write(&seasons, &seasons_list_location(show_dir))?;
        summary.seasons += seasons.len();

        debug!(show = %show.name, seasons = seasons.len(), "seasons written to disk");
        Ok(())
    }

    /// Writes one descriptor per catalog episode of the season in
    /// `season_dir`, then `<show>/<n>/episodes.json`.
    fn write_episodes(
        &self,
        season_dir: &Path,
        show: &Show,
        summary: &mut WalkSummary,
    ) -> Result<(), WalkError> {
        let number = season_dir
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_season_number)
            .ok_or_else(|| WalkError::InvalidSeasonDirectory(season_dir.to_path_buf()))?;

        let season = show.season(number).ok_or_else(|| WalkError::SeasonNotFound {
            show: show.name.clone(),
            season: number,
        })?;

        let mut episodes = Vec::with_capacity(season.episodes.len());
        let file_names = episode_file_names(&season.episodes);

        for (episode, file_name) in season.episodes.iter().zip(&file_names) {
            let video_url = match self.matcher.find_video(episode, season_dir) {
                Some(found) => {
                    summary.videos += 1;
                    Some(self.writer.url_for(&season_dir.join(&found.file_name))?)
                }
                None => {
                    debug!(
                        show = %show.name,
                        season = number,
                        episode = episode.episode_number,
                        title = %episode.name,
                        "no video file for episode"
                    );
                    None
                }
            };

            let location = episode_location(season_dir, file_name);
            let descriptor =
                EpisodeDescriptor::new(episode, self.writer.url_for(&location)?, video_url);

            self.writer.write(&descriptor, &location)?;
            episodes.push(descriptor);
        }

        self.writer
            .write(&episodes, &episodes_list_location(season_dir))?;
        summary.episodes += episodes.len();

        debug!(show = %show.name, season = number, episodes = episodes.len(), "episodes written to disk");
        Ok(())
    }
}
