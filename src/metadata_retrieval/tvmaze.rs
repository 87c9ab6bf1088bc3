//! TVMaze metadata provider implementation.

use super::tvmaze_types::{TvMazeEpisode, TvMazeImage, TvMazeShow};
use super::{Episode, Image, MetadataProvider, MetadataRetrievalError, RetryPolicy, Season, Show};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Public TVMaze API endpoint.
pub const DEFAULT_TVMAZE_URL: &str = "https://api.tvmaze.com";

/// Metadata provider for the TVMaze API.
///
/// A show is resolved in three steps: a fuzzy single search on the name, a
/// detail fetch by id, and the episode enumeration of that id. Every request
/// goes through the configured retry policy.
pub struct TvMazeProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TvMazeProvider {
    /// Creates a new TVMaze provider talking to `base_url`.
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Issues a GET request and decodes the JSON body.
    ///
    /// A 404 is reported as `SeriesNotFound` for `subject`.
    fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        subject: &str,
    ) -> Result<T, MetadataRetrievalError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        self.retry.run(|attempt| {
            debug!(url = %url, attempt, "querying TVMaze");

            let response = self
                .client
                .get(&url)
                .query(query)
                .send()
                .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

            if let Some(e) = Self::status_error(response.status(), subject) {
                return Err(e);
            }

            response
                .json()
                .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
        })
    }

    /// The error a non-success status stands for, `None` on success.
    ///
    /// 404 means the catalog has no such show and is terminal; any other
    /// failure is reported with its status so the retry policy can judge it.
    fn status_error(status: StatusCode, subject: &str) -> Option<MetadataRetrievalError> {
        if status.is_success() {
            return None;
        }

        if status == StatusCode::NOT_FOUND {
            return Some(MetadataRetrievalError::SeriesNotFound(subject.to_string()));
        }

        Some(MetadataRetrievalError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }

    /// Ensures the detail document belongs to the show the search returned.
    fn check_detail_id(expected: u64, detail: &TvMazeShow) -> Result<(), MetadataRetrievalError> {
        if detail.id != expected {
            return Err(MetadataRetrievalError::InvalidData(format!(
                "detail for show {} returned id {}",
                expected, detail.id
            )));
        }
        Ok(())
    }

    fn convert_image(image: Option<TvMazeImage>) -> Option<Image> {
        image
            .map(|i| Image {
                medium: i.medium,
                original: i.original,
            })
            .filter(|i| i.medium.is_some() || i.original.is_some())
    }

    fn html_to_text(html: Option<String>) -> String {
        html.map(|s| nanohtml2text::html2text(&s).trim().to_string())
            .unwrap_or_default()
    }

    /// Converts a TVMaze episode to our internal Episode structure.
    ///
    /// Episodes without a number (unnumbered specials) cannot be addressed
    /// within a season and are dropped.
    fn convert_episode(tvmaze_episode: TvMazeEpisode) -> Option<Episode> {
        let episode_number = tvmaze_episode.number?;

        Some(Episode {
            season_number: tvmaze_episode.season,
            episode_number,
            name: tvmaze_episode
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            summary: Self::html_to_text(tvmaze_episode.summary),
            image: Self::convert_image(tvmaze_episode.image),
        })
    }

    /// Converts TVMaze show data and its episode list to our internal Show.
    ///
    /// Groups episodes by season, orders seasons and episodes by number and
    /// keeps only the first episode for any duplicated number.
    fn convert_to_show(tvmaze_show: TvMazeShow, episodes: Vec<TvMazeEpisode>) -> Show {
        let mut seasons_map: BTreeMap<usize, Vec<Episode>> = BTreeMap::new();

        for tvmaze_episode in episodes {
            let Some(episode) = Self::convert_episode(tvmaze_episode) else {
                continue;
            };

            seasons_map
                .entry(episode.season_number)
                .or_default()
                .push(episode);
        }

        let seasons = seasons_map
            .into_iter()
            .map(|(season_number, mut episodes)| {
                // stable sort keeps the first of any duplicated number in front
                episodes.sort_by_key(|e| e.episode_number);
                episodes.dedup_by_key(|e| e.episode_number);
                Season {
                    season_number,
                    episodes,
                }
            })
            .collect();

        Show {
            id: tvmaze_show.id,
            name: tvmaze_show.name,
            summary: Self::html_to_text(tvmaze_show.summary),
            image: Self::convert_image(tvmaze_show.image),
            seasons,
        }
    }
}

impl MetadataProvider for TvMazeProvider {
    fn fetch_show(&self, query: &str) -> Result<Show, MetadataRetrievalError> {
        let found: TvMazeShow = self.get_json("/singlesearch/shows", &[("q", query)], query)?;
        debug!(query, id = found.id, name = %found.name, "matched search query with show");

        let detail_path = format!("/shows/{}", found.id);
        let detail: TvMazeShow = self.get_json(&detail_path, &[], &found.name)?;

        Self::check_detail_id(found.id, &detail)?;

        let episodes_path = format!("/shows/{}/episodes", found.id);
        let episodes: Vec<TvMazeEpisode> = self.get_json(&episodes_path, &[], &found.name)?;

        let show = Self::convert_to_show(detail, episodes);
        info!(
            query,
            show = %show.name,
            seasons = show.seasons.len(),
            episodes = show.episode_count(),
            "fetched show metadata"
        );

        Ok(show)
    }
}
