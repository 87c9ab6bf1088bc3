//! Matching catalog episodes to video files on disk
//!
//! A season directory is expected to contain the video files of that season.
//! Files carrying the canonical `sNNeNN` notation are matched directly; the
//! rest are scored by edit distance between the episode title and the file
//! name.

use crate::metadata_retrieval::Episode;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Largest edit distance at which a title still matches a file name.
pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 15;

/// File extensions considered video files, compared case-insensitively.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi"];

/// How a video file was matched to an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The file name contains the episode's `sNNeNN` token
    Notation,
    /// The file name is close enough to the episode title
    Similarity { distance: usize },
}

/// A video file accepted for an episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMatch {
    /// File name within the season directory
    pub file_name: String,
    pub kind: MatchKind,
}

/// Finds the video file belonging to an episode within a season directory
#[derive(Debug, Clone)]
pub struct VideoMatcher {
    extensions: Vec<String>,
    max_edit_distance: usize,
}

impl Default for VideoMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_EXTENSIONS, DEFAULT_MAX_EDIT_DISTANCE)
    }
}

impl VideoMatcher {
    /// Creates a matcher accepting the given extensions (with or without a
    /// leading dot).
    pub fn new<S: AsRef<str>>(extensions: &[S], max_edit_distance: usize) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            max_edit_distance,
        }
    }

    /// Finds the video file for `episode` in `season_dir`.
    ///
    /// A directory that cannot be listed is treated as empty.
    pub fn find_video(&self, episode: &Episode, season_dir: &Path) -> Option<VideoMatch> {
        let candidates = match self.list_candidates(season_dir) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    path = %season_dir.display(),
                    season = episode.season_number,
                    error = %e,
                    "failed to read season directory"
                );
                Vec::new()
            }
        };

        self.select(episode, &candidates)
    }

    /// Lists video file names in `dir`, sorted by name.
    pub fn list_candidates(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            // follow symlinks; a dangling link is not a candidate
            if !path.is_file() || !self.has_video_extension(&path) {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(file = ?name, "skipping non UTF-8 file name"),
            }
        }

        names.sort();
        Ok(names)
    }

    fn has_video_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Picks the best candidate for `episode` out of `candidates`.
    ///
    /// Candidates are considered in sorted order regardless of the order they
    /// are passed in. The first one containing the notation token wins.
    /// Otherwise the one with the smallest edit distance to the title wins,
    /// earliest on ties, provided the distance does not exceed the threshold.
    pub fn select<S: AsRef<str>>(&self, episode: &Episode, candidates: &[S]) -> Option<VideoMatch> {
        let mut sorted: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();

        let token = notation_token(episode.season_number, episode.episode_number);
        if let Some(name) = sorted.iter().find(|name| name.contains(&token)) {
            debug!(file = %name, token = %token, "matched by notation");
            return Some(VideoMatch {
                file_name: name.to_string(),
                kind: MatchKind::Notation,
            });
        }

        let mut best: Option<(&str, usize)> = None;
        for name in sorted {
            let distance = edit_distance(&episode.name, name);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((name, distance));
            }
        }

        let (name, distance) = best?;
        if distance > self.max_edit_distance {
            debug!(
                title = %episode.name,
                file = %name,
                distance,
                "closest file is too different from the title"
            );
            return None;
        }

        debug!(title = %episode.name, file = %name, distance, "matched by title");
        Some(VideoMatch {
            file_name: name.to_string(),
            kind: MatchKind::Similarity { distance },
        })
    }
}

/// The `sNNeNN` token identifying an episode in a file name.
pub fn notation_token(season: usize, episode: usize) -> String {
    format!("s{:02}e{:02}", season, episode)
}

/// Levenshtein distance over Unicode code points with unit costs.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
