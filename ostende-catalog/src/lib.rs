//! Ostende Catalog - Movie catalog data model
//!
//! Decodes the catalog API's JSON responses and turns a movie's torrent
//! listing into a `PlaybackRequest` for the orchestration layer. Fetching
//! the responses is left to the embedding application.

pub mod errors;
pub mod magnet;
pub mod types;

pub use errors::CatalogError;
pub use magnet::{CATALOG_TRACKERS, magnet_locator};
pub use types::{
    Movie, MovieDetailsResponse, MovieListResponse, MovieSuggestionsResponse, STATUS_OK,
    TorrentRecord,
};

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Decodes a paged movie listing.
///
/// # Errors
/// - `CatalogError::ParseError` - Body is not a listing
/// - `CatalogError::ApiStatus` - The API reported a failure
pub fn parse_movie_list(body: &str) -> Result<MovieListResponse> {
    let response: MovieListResponse = serde_json::from_str(body)?;
    check_status(&response.status, &response.status_message)?;
    tracing::debug!(
        "Movie listing page {}: {} of {} movie(s)",
        response.data.page_number,
        response.data.movies.len(),
        response.data.movie_count
    );
    Ok(response)
}

/// Decodes a single movie lookup.
///
/// # Errors
/// - `CatalogError::ParseError` - Body is not a details response
/// - `CatalogError::ApiStatus` - The API reported a failure
pub fn parse_movie_details(body: &str) -> Result<MovieDetailsResponse> {
    let response: MovieDetailsResponse = serde_json::from_str(body)?;
    check_status(&response.status, &response.status_message)?;
    Ok(response)
}

/// Decodes movie suggestions.
///
/// # Errors
/// - `CatalogError::ParseError` - Body is not a suggestions response
/// - `CatalogError::ApiStatus` - The API reported a failure
pub fn parse_movie_suggestions(body: &str) -> Result<MovieSuggestionsResponse> {
    let response: MovieSuggestionsResponse = serde_json::from_str(body)?;
    check_status(&response.status, &response.status_message)?;
    Ok(response)
}

// Missing status is accepted: some endpoints omit it on success.
fn check_status(status: &str, message: &str) -> Result<()> {
    if status.is_empty() || status.eq_ignore_ascii_case(STATUS_OK) {
        return Ok(());
    }
    tracing::warn!("Catalog API returned status '{}': {}", status, message);
    Err(CatalogError::ApiStatus {
        status: status.to_string(),
        message: message.to_string(),
    })
}
