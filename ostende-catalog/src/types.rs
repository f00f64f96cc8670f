//! Data types of the movie catalog API.

use ostende_core::source::PlaybackRequest;
use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::magnet::{CATALOG_TRACKERS, magnet_locator};

/// Status value of a successful response.
pub const STATUS_OK: &str = "ok";

/// Paged movie listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieListResponse {
    pub status: String,
    pub status_message: String,
    pub data: MovieListData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieListData {
    pub movie_count: u64,
    pub limit: u32,
    pub page_number: u32,
    pub movies: Vec<Movie>,
}

/// Single movie lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieDetailsResponse {
    pub status: String,
    pub status_message: String,
    pub data: MovieDetailsData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieDetailsData {
    pub movie: Movie,
}

/// Movies suggested alongside a details page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSuggestionsResponse {
    pub status: String,
    pub status_message: String,
    pub data: MovieSuggestionsData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSuggestionsData {
    pub movies: Vec<Movie>,
}

/// Catalog entry for one movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub year: u16,
    pub rating: f32,
    /// Minutes
    pub runtime: u32,
    pub genres: Vec<String>,
    pub summary: String,
    pub language: String,
    pub medium_cover_image: String,
    pub large_cover_image: String,
    pub background_image: String,
    pub description_full: String,
    pub yt_trailer_code: String,
    pub torrents: Vec<TorrentRecord>,
}

impl Movie {
    /// Playback request for the torrent with `selected_hash`.
    ///
    /// The selected torrent is the primary locator, the movie's other
    /// torrents follow as fallbacks in listing order. Torrents sharing a
    /// hash are offered once.
    ///
    /// # Errors
    /// - `CatalogError::UnknownTorrent` - No torrent of this movie has the hash
    pub fn playback_request(&self, selected_hash: &str) -> Result<PlaybackRequest, CatalogError> {
        let selected = self
            .torrents
            .iter()
            .find(|torrent| torrent.has_hash(selected_hash))
            .ok_or_else(|| CatalogError::UnknownTorrent {
                hash: selected_hash.to_string(),
                movie_id: self.id,
            })?;

        let mut seen = vec![selected.normalized_hash()];
        let mut fallbacks = Vec::new();
        for torrent in &self.torrents {
            let hash = torrent.normalized_hash();
            if hash.is_empty() || seen.contains(&hash) {
                continue;
            }
            fallbacks.push(torrent.magnet_locator(&self.title));
            seen.push(hash);
        }

        tracing::debug!(
            "Playback request for '{}' ({}): {} fallback(s)",
            self.title,
            selected.label(),
            fallbacks.len()
        );

        Ok(PlaybackRequest::new(selected.magnet_locator(&self.title)).with_fallbacks(fallbacks))
    }

    /// Playback request starting from the first listed torrent.
    ///
    /// # Errors
    /// - `CatalogError::NoTorrents` - The movie lists no torrent
    pub fn default_playback_request(&self) -> Result<PlaybackRequest, CatalogError> {
        let first = self
            .torrents
            .first()
            .ok_or(CatalogError::NoTorrents { movie_id: self.id })?;
        self.playback_request(&first.hash)
    }

    /// "2h 7m" style runtime, empty when unknown.
    pub fn runtime_label(&self) -> String {
        match (self.runtime / 60, self.runtime % 60) {
            (0, 0) => String::new(),
            (0, minutes) => format!("{minutes}m"),
            (hours, minutes) => format!("{hours}h {minutes}m"),
        }
    }
}

/// One downloadable release of a movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentRecord {
    pub url: String,
    pub hash: String,
    pub quality: String,
    /// Human formatted, e.g. "1.2 GB"
    pub size: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TorrentRecord {
    /// "quality · size" for the release picker.
    pub fn label(&self) -> String {
        format!("{} · {}", self.quality, self.size)
    }

    /// Magnet locator announcing to the catalog trackers.
    pub fn magnet_locator(&self, title: &str) -> String {
        magnet_locator(&self.hash, title, CATALOG_TRACKERS)
    }

    fn normalized_hash(&self) -> String {
        self.hash.trim().to_ascii_lowercase()
    }

    fn has_hash(&self, hash: &str) -> bool {
        self.hash.trim().eq_ignore_ascii_case(hash.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(hash: &str, quality: &str) -> TorrentRecord {
        TorrentRecord {
            url: format!("https://catalog.test/torrent/download/{hash}"),
            hash: hash.to_string(),
            quality: quality.to_string(),
            size: "1.2 GB".to_string(),
            kind: "web".to_string(),
        }
    }

    fn movie() -> Movie {
        Movie {
            id: 7,
            title: "Night Train".to_string(),
            runtime: 127,
            torrents: vec![
                torrent("AAAA", "720p"),
                torrent("BBBB", "1080p"),
                torrent("aaaa", "720p"),
                torrent("CCCC", "2160p"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_selected_torrent_is_primary_and_rest_follow() {
        let request = movie().playback_request("BBBB").unwrap();

        assert!(request.primary.contains("xt=urn:btih:BBBB"));
        assert!(request.primary.contains("dn=Night%20Train"));
        assert_eq!(request.fallbacks.len(), 2);
        assert!(request.fallbacks[0].contains("btih:AAAA"));
        assert!(request.fallbacks[1].contains("btih:CCCC"));
    }

    #[test]
    fn test_duplicate_of_selected_is_dropped() {
        let request = movie().playback_request("aaaa").unwrap();

        assert!(request.primary.contains("btih:AAAA"));
        assert_eq!(request.fallbacks.len(), 2);
        assert!(request.fallbacks.iter().all(|f| !f.contains("btih:aaaa")));
    }

    #[test]
    fn test_unknown_and_missing_torrents() {
        assert!(matches!(
            movie().playback_request("ffff"),
            Err(CatalogError::UnknownTorrent { movie_id: 7, .. })
        ));

        let empty = Movie {
            id: 9,
            ..Default::default()
        };
        assert!(matches!(
            empty.default_playback_request(),
            Err(CatalogError::NoTorrents { movie_id: 9 })
        ));
    }

    #[test]
    fn test_default_request_uses_first_listing() {
        let request = movie().default_playback_request().unwrap();
        assert!(request.primary.contains("btih:AAAA"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(torrent("AAAA", "720p").label(), "720p · 1.2 GB");
        assert_eq!(movie().runtime_label(), "2h 7m");
        assert_eq!(Movie::default().runtime_label(), "");
    }
}
