pub mod cache;
pub mod rate_limiter;
pub mod tmdb;
pub mod tvdb;

use crate::error::CoreResult;
use crate::models::CandidateSnapshot;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Resolved external ids for a series, as returned by `get_series_external_ids`.
#[derive(Debug, Clone, Default)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<String>,
}

/// Full metadata for one catalog entry, fetched after a candidate is
/// selected (§4.2 `get_movie_details`/`get_series_details`).
#[derive(Debug, Clone, Default)]
pub struct MediaDetails {
    pub external_id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub duration_seconds: Option<f64>,
    pub max_episode_count: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct EpisodeTitle {
    pub episode: i32,
    pub title: String,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

/// Uniform interface over TMDB and TVDB (§4.2). The matcher dispatches over
/// `MediaTypeHint` to pick the right endpoint, never over the client type
/// itself, so this trait stays object-safe for a tagged-variant dispatch.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>>;

    async fn get_movie_details(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails>;

    async fn find_by_external_id(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<MediaDetails>>;

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>>;

    async fn get_series_details(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails>;

    async fn get_series_external_ids(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<ExternalIds>;

    async fn get_episode_titles(
        &self,
        series_external_id: &str,
        season: i32,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<EpisodeTitle>>;
}
