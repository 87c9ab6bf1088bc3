//! Data structures and traits for TV show metadata retrieval.
//!
//! This module provides structures to represent TV shows, seasons, and episodes
//! with their associated metadata (names, summaries, images), as well as the
//! trait that catalog providers implement.

mod query;
mod retry;
mod tvmaze;
mod tvmaze_types;

pub use query::QueryNormalizer;
pub use retry::RetryPolicy;
pub use tvmaze::{DEFAULT_TVMAZE_URL, TvMazeProvider};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed before a response arrived
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The provider answered with an unexpected HTTP status
    #[error("HTTP {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested series was not found
    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

impl MetadataRetrievalError {
    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// everything else is an answer that will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MetadataRetrievalError::RequestError(_) => true,
            MetadataRetrievalError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Image references delivered by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

/// Represents a single episode of a TV show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// The season number this episode belongs to
    pub season_number: usize,
    /// The episode number within the season
    pub episode_number: usize,
    /// The episode title
    pub name: String,
    /// A brief plain-text summary of the episode
    pub summary: String,
    /// Still image of the episode, if the catalog has one
    pub image: Option<Image>,
}

/// Represents a season of a TV show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// The season number
    pub season_number: usize,
    /// Episodes of this season, ordered by episode number
    pub episodes: Vec<Episode>,
}

/// Represents a complete TV show with all seasons and episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    /// Stable identifier of the show in the remote catalog
    pub id: u64,
    /// The name of the TV show
    pub name: String,
    /// A brief plain-text summary of the show
    pub summary: String,
    /// Poster image of the show, if the catalog has one
    pub image: Option<Image>,
    /// Seasons of this show, ordered by season number
    pub seasons: Vec<Season>,
}

impl Show {
    /// Looks up a season by its number.
    pub fn season(&self, number: usize) -> Option<&Season> {
        self.seasons.iter().find(|s| s.season_number == number)
    }

    /// Total number of episodes across all seasons.
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

/// Trait for metadata providers that can resolve a show from a directory name.
///
/// Implementors search their catalog for the best matching show, fetch its
/// details and enumerate its seasons and episodes. Providers are shared
/// between worker threads, so any per-request state must stay local to the
/// call.
pub trait MetadataProvider {
    /// Resolves a show by a free-form query, typically a directory name.
    ///
    /// # Arguments
    ///
    /// * `query` - The (already normalized) name to search for
    ///
    /// # Returns
    ///
    /// A Result containing the complete Show, or a MetadataRetrievalError
    fn fetch_show(&self, query: &str) -> Result<Show, MetadataRetrievalError>;
}
