//! Error types for catalog data handling.

use thiserror::Error;

/// Errors raised while reading catalog responses or choosing torrents.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Response body was not the expected JSON shape.
    #[error("Parse error: {reason}")]
    ParseError {
        /// What the decoder rejected
        reason: String,
    },

    /// The API answered with a non-ok status.
    #[error("Catalog API returned status '{status}': {message}")]
    ApiStatus {
        /// Status field of the response
        status: String,
        /// Accompanying status message
        message: String,
    },

    /// The movie lists no torrent at all.
    #[error("Movie {movie_id} has no torrents")]
    NoTorrents {
        /// Catalog id of the movie
        movie_id: u64,
    },

    /// The selected hash is not one of the movie's torrents.
    #[error("Torrent {hash} not listed for movie {movie_id}")]
    UnknownTorrent {
        /// Requested info hash
        hash: String,
        /// Catalog id of the movie
        movie_id: u64,
    },
}

impl From<serde_json::Error> for CatalogError {
    fn from(error: serde_json::Error) -> Self {
        CatalogError::ParseError {
            reason: error.to_string(),
        }
    }
}
