//! TVMaze API response types for deserialization.
//!
//! These structures mirror the JSON response format from the TVMaze API.

use serde::Deserialize;

/// A show as returned by `/singlesearch/shows` and `/shows/:id`.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShow {
    /// TVMaze's stable show identifier
    pub id: u64,
    /// The name of the TV show
    pub name: String,
    /// Show summary in HTML format (may be null)
    pub summary: Option<String>,
    /// Poster image (may be null)
    pub image: Option<TvMazeImage>,
}

/// Image URLs in two sizes; either may be missing.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeImage {
    pub medium: Option<String>,
    pub original: Option<String>,
}

/// A single episode from `/shows/:id/episodes`.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEpisode {
    /// Season number (0 for specials)
    pub season: usize,
    /// Episode number within the season (null for some specials)
    pub number: Option<usize>,
    /// Episode title (may be null for episodes without a title)
    pub name: Option<String>,
    /// Episode summary in HTML format (may be null)
    pub summary: Option<String>,
    /// Still image (may be null)
    pub image: Option<TvMazeImage>,
}
