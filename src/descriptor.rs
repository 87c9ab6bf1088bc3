//! Descriptor documents and where they live
//!
//! Every level of the media hierarchy is described by a single-entity JSON
//! document and every list of entities by a list document embedding the very
//! same objects. URLs inside the documents are the root-relative locations of
//! the single-entity documents, joined with `/` and prefixed with the
//! configured document root.

use crate::metadata_retrieval::{Episode, Image, Show};
use crate::temp::create_staging_file;
use crate::video_matcher::notation_token;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the root-level list of shows
pub const SHOWS_INDEX: &str = "shows.json";
/// Name of the per-show list of seasons
pub const SEASONS_INDEX: &str = "seasons.json";
/// Name of the per-season list of episodes
pub const EPISODES_INDEX: &str = "episodes.json";
/// Name of the viewer app page in the root and in every show directory
pub const APP_PAGE: &str = "index.html";

/// Errors that can occur while writing descriptors
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Failed to serialize a descriptor
    #[error("Failed to serialize descriptor {path}: {source}")]
    SerializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to write a descriptor file
    #[error("Failed to write descriptor {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// A location that cannot be expressed relative to the root
    #[error("Location is not below the media root: {0}")]
    OutsideRoot(PathBuf),

    /// A location that has no UTF-8 form and therefore no URL
    #[error("Location is not valid UTF-8: {0}")]
    NotUnicode(PathBuf),
}

/// A show, as listed in `shows.json` and written to `<show>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowDescriptor {
    pub id: u64,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    pub url: String,
    pub seasons_url: String,
}

/// A season, as listed in `seasons.json` and written to `<n>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDescriptor {
    pub number: usize,
    pub url: String,
    pub episodes_url: String,
}

/// An episode, as listed in `episodes.json` and written to `<title>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDescriptor {
    pub season: usize,
    pub number: usize,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl ShowDescriptor {
    pub fn new(show: &Show, url: String, seasons_url: String) -> Self {
        Self {
            id: show.id,
            title: show.name.clone(),
            summary: show.summary.clone(),
            image: show.image.clone(),
            url,
            seasons_url,
        }
    }
}

impl EpisodeDescriptor {
    pub fn new(episode: &Episode, url: String, video_url: Option<String>) -> Self {
        Self {
            season: episode.season_number,
            number: episode.episode_number,
            title: episode.name.clone(),
            summary: episode.summary.clone(),
            image: episode.image.clone(),
            url,
            video_url,
        }
    }
}

/// `<root>/<show>.json`
pub fn show_location(root: &Path, show_dir: &Path) -> PathBuf {
    let mut name: OsString = show_dir.file_name().unwrap_or_default().to_os_string();
    name.push(".json");
    root.join(name)
}

/// `<directory>/index.html`, for the root or a show directory
pub fn app_location(directory: &Path) -> PathBuf {
    directory.join(APP_PAGE)
}

/// `<show>/seasons.json`
pub fn seasons_list_location(show_dir: &Path) -> PathBuf {
    show_dir.join(SEASONS_INDEX)
}

/// `<show>/<n>` (the on-disk season directory)
pub fn season_directory(show_dir: &Path, number: usize) -> PathBuf {
    show_dir.join(number.to_string())
}

/// `<show>/<n>.json`
pub fn season_location(show_dir: &Path, number: usize) -> PathBuf {
    show_dir.join(format!("{}.json", number))
}

/// `<show>/<n>/episodes.json`
pub fn episodes_list_location(season_dir: &Path) -> PathBuf {
    season_dir.join(EPISODES_INDEX)
}

/// `<show>/<n>/<file name>`, see [`episode_file_names`]
pub fn episode_location(season_dir: &Path, file_name: &str) -> PathBuf {
    season_dir.join(file_name)
}

/// Longest title stem kept in an episode file name, in bytes
const MAX_TITLE_STEM: usize = 200;

/// Whether a show directory name would make `<show>.json` overwrite the root
/// show list.
pub fn is_reserved_show_name(name: &str) -> bool {
    SHOWS_INDEX
        .strip_suffix(".json")
        .is_some_and(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Title part of an episode file name
///
/// Path separators and NUL become a single space. Long titles are cut on a
/// character boundary.
fn title_stem(title: &str) -> String {
    let mut stem = String::new();
    for c in title.chars().map(|c| match c {
        '/' | '\\' | '\0' => ' ',
        c => c,
    }) {
        if stem.len() + c.len_utf8() > MAX_TITLE_STEM {
            break;
        }
        stem.push(c);
    }
    stem.trim().to_string()
}

/// File names of the single-episode descriptors of one season, in the order
/// of `episodes`.
///
/// An episode is named `<title>.json` when that name is unique within the
/// season and does not clash with `episodes.json`. Otherwise the name is
/// qualified with the notation token, `sNNeNN <title>.json`. Episodes
/// without a usable title are named `sNNeNN.json`. Episode numbers are
/// unique within a season, and no token contains a space, so qualified names
/// never clash with each other.
pub fn episode_file_names(episodes: &[Episode]) -> Vec<String> {
    let stems: Vec<String> = episodes.iter().map(|e| title_stem(&e.name)).collect();
    let reserved = EPISODES_INDEX.strip_suffix(".json").unwrap_or(EPISODES_INDEX);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }

    let qualify = |i: usize| {
        let episode = &episodes[i];
        let token = notation_token(episode.season_number, episode.episode_number);
        if stems[i].is_empty() {
            format!("{}.json", token)
        } else {
            format!("{} {}.json", token, stems[i])
        }
    };

    let mut names = Vec::with_capacity(episodes.len());
    let mut qualified = vec![false; episodes.len()];
    for (i, stem) in stems.iter().enumerate() {
        if stem.is_empty() || counts[stem.as_str()] > 1 || stem.eq_ignore_ascii_case(reserved) {
            names.push(qualify(i));
            qualified[i] = true;
        } else {
            names.push(format!("{}.json", stem));
        }
    }

    // a plain title may spell out another episode's qualified name
    loop {
        let clash = {
            let taken: HashSet<&str> = (0..names.len())
                .filter(|&i| qualified[i])
                .map(|i| names[i].as_str())
                .collect();
            (0..names.len()).find(|&i| !qualified[i] && taken.contains(names[i].as_str()))
        };
        let Some(clash) = clash else {
            break;
        };
        names[clash] = qualify(clash);
        qualified[clash] = true;
    }

    names
}

/// Serializes descriptors and computes their URLs
#[derive(Debug, Clone)]
pub struct DescriptorWriter {
    root: PathBuf,
    document_root: String,
}

impl DescriptorWriter {
    /// Creates a writer for documents below `root`.
    ///
    /// `document_root` is prepended verbatim to every URL; pass an empty
    /// string for plain root-relative URLs.
    pub fn new(root: impl Into<PathBuf>, document_root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            document_root: document_root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL of `location`: its segments below the root joined with `/`.
    pub fn url_for(&self, location: &Path) -> Result<String, DescriptorError> {
        let relative = location
            .strip_prefix(&self.root)
            .map_err(|_| DescriptorError::OutsideRoot(location.to_path_buf()))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(
                    segment
                        .to_str()
                        .ok_or_else(|| DescriptorError::NotUnicode(location.to_path_buf()))?,
                ),
                _ => return Err(DescriptorError::OutsideRoot(location.to_path_buf())),
            }
        }

        if segments.is_empty() {
            return Err(DescriptorError::OutsideRoot(location.to_path_buf()));
        }

        Ok(format!("{}{}", self.document_root, segments.join("/")))
    }

    /// Writes `entity` as indented JSON to `location`.
    ///
    /// The parent directory must already exist. The document is staged next
    /// to its destination and renamed into place, so readers never see a
    /// partially written file.
    pub fn write<T>(&self, entity: &T, location: &Path) -> Result<(), DescriptorError>
    where
        T: Serialize + ?Sized,
    {
        let mut content = serde_json::to_vec_pretty(entity).map_err(|e| {
            DescriptorError::SerializationFailed {
                path: location.to_path_buf(),
                source: e,
            }
        })?;
        content.push(b'\n');

        self.write_bytes(&content, location)?;
        debug!(path = %location.display(), "descriptor written to disk");
        Ok(())
    }

    /// Writes `content` verbatim to `location`, staged like [`Self::write`].
    pub fn write_bytes(&self, content: &[u8], location: &Path) -> Result<(), DescriptorError> {
        let write_failed = |source| DescriptorError::WriteFailed {
            path: location.to_path_buf(),
            source,
        };

        let (guard, mut file) = create_staging_file(location).map_err(write_failed)?;
        file.write_all(content).map_err(write_failed)?;
        drop(file);
        guard.persist(location).map_err(write_failed)
    }
}
