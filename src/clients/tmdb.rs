//! TMDB catalog client (§4.2): movies and TV search/details behind the
//! rate-limited, retrying, two-tier-cached `CatalogClient` contract.

use crate::clients::cache::MemoryCache;
use crate::clients::rate_limiter::{retry_async, RateLimitedClient, ResponseExt, RetryConfig};
use crate::clients::{CatalogClient, EpisodeTitle, ExternalIds, MediaDetails};
use crate::db::Store;
use crate::error::{CoreError, CoreResult};
use crate::models::{CandidateSnapshot, CatalogSource};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

pub struct TmdbClient {
    rate: RateLimitedClient,
    memory: MemoryCache,
    store: Store,
    api_key: String,
    retry: RetryConfig,
}

impl TmdbClient {
    #[must_use]
    pub fn new(api_key: String, store: Store) -> Self {
        Self {
            rate: RateLimitedClient::for_tmdb(),
            memory: MemoryCache::default(),
            store,
            api_key,
            retry: RetryConfig::default(),
        }
    }

    fn fingerprint(endpoint: &str, params: &[(&str, String)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let key = format!("tmdb:{endpoint}?{joined}");
        format!("{:016x}", xxhash_rust::xxh3::xxh3_64(key.as_bytes()))
    }

    async fn cached_get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> CoreResult<String> {
        let fingerprint = Self::fingerprint(endpoint, params);

        if let Some(hit) = self.memory.get(&fingerprint) {
            return Ok(hit);
        }
        if let Some(hit) = self.store.catalog_cache().get_fresh(&fingerprint).await? {
            self.memory.put(fingerprint, hit.clone());
            return Ok(hit);
        }

        let url = format!("{BASE_URL}{endpoint}");
        let mut full_params: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        full_params.extend_from_slice(params);

        let body = retry_async(
            || async {
                let response = self
                    .rate
                    .get_with_query(&url, &full_params, &[], cancel)
                    .await?;

                if response.is_rate_limited() {
                    return Err(CoreError::ExternalRateLimited("tmdb".to_string()));
                }
                if response.is_transient_error() {
                    return Err(CoreError::ExternalTransient(format!(
                        "tmdb {}",
                        response.status()
                    )));
                }
                if !response.status().is_success() {
                    return Err(CoreError::ExternalPermanent(format!(
                        "tmdb {}",
                        response.status()
                    )));
                }
                response
                    .text()
                    .await
                    .map_err(|e| CoreError::ExternalTransient(e.to_string()))
            },
            &self.retry,
            endpoint,
            cancel,
        )
        .await?;

        self.store.catalog_cache().put(&fingerprint, &body).await?;
        self.memory.put(fingerprint, body.clone());
        Ok(body)
    }
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct TmdbMovieSummary {
    id: i64,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    vote_count: i64,
}

#[derive(Deserialize)]
struct TmdbSeriesSummary {
    id: i64,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    vote_count: i64,
}

#[derive(Deserialize)]
struct TmdbMovieDetails {
    id: i64,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    runtime: Option<i32>,
    genres: Vec<TmdbGenre>,
    overview: Option<String>,
    poster_path: Option<String>,
    credits: Option<TmdbCredits>,
}

#[derive(Deserialize)]
struct TmdbSeriesDetails {
    id: i64,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    number_of_episodes: Option<i32>,
    genres: Vec<TmdbGenre>,
    overview: Option<String>,
    poster_path: Option<String>,
    external_ids: Option<TmdbExternalIds>,
}

#[derive(Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Deserialize)]
struct TmdbCredits {
    cast: Vec<TmdbCastMember>,
    crew: Vec<TmdbCrewMember>,
}

#[derive(Deserialize)]
struct TmdbCastMember {
    name: String,
}

#[derive(Deserialize)]
struct TmdbCrewMember {
    name: String,
    job: String,
}

#[derive(Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<i64>,
}

#[derive(Deserialize)]
struct TmdbSeason {
    episodes: Vec<TmdbEpisode>,
}

#[derive(Deserialize)]
struct TmdbEpisode {
    episode_number: i32,
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
}

fn year_from_date(date: &Option<String>) -> Option<i32> {
    date.as_deref()?.get(0..4)?.parse().ok()
}

fn poster_url(path: &Option<String>) -> Option<String> {
    path.as_ref().map(|p| format!("{IMAGE_BASE}{p}"))
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        let mut params: Vec<(&str, String)> = vec![("query", title.to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }
        let body = self.cached_get("/search/movie", &params, cancel).await?;
        let parsed: SearchResponse<TmdbMovieSummary> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(10)
            .map(|m| CandidateSnapshot {
                source: CatalogSource::Tmdb,
                external_id: m.id.to_string(),
                title: m.title,
                original_title: m.original_title,
                year: year_from_date(&m.release_date),
                score: 0.0,
                poster_url: poster_url(&m.poster_path),
                overview: m.overview,
                cast_summary: None,
                duration_seconds: None,
                max_episode_count: None,
                vote_count: m.vote_count,
            })
            .collect())
    }

    async fn get_movie_details(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails> {
        let endpoint = format!("/movie/{external_id}");
        let body = self
            .cached_get(&endpoint, &[("append_to_response", "credits".to_string())], cancel)
            .await?;
        let parsed: TmdbMovieDetails = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;

        let director = parsed
            .credits
            .as_ref()
            .and_then(|c| c.crew.iter().find(|m| m.job == "Director"))
            .map(|m| m.name.clone());
        let cast = parsed
            .credits
            .map(|c| c.cast.into_iter().take(5).map(|m| m.name).collect())
            .unwrap_or_default();

        Ok(MediaDetails {
            external_id: parsed.id.to_string(),
            title: parsed.title,
            original_title: parsed.original_title,
            year: year_from_date(&parsed.release_date),
            genres: parsed.genres.into_iter().map(|g| g.name).collect(),
            overview: parsed.overview,
            poster_url: poster_url(&parsed.poster_path),
            director,
            cast,
            duration_seconds: parsed.runtime.map(|m| f64::from(m) * 60.0),
            max_episode_count: None,
        })
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<MediaDetails>> {
        let endpoint = format!("/find/{external_id}");
        let body = self
            .cached_get(&endpoint, &[("external_source", "imdb_id".to_string())], cancel)
            .await?;
        let parsed: SearchResponse<TmdbMovieSummary> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;
        let Some(first) = parsed.results.into_iter().next() else {
            return Ok(None);
        };
        self.get_movie_details(&first.id.to_string(), cancel)
            .await
            .map(Some)
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        let mut params: Vec<(&str, String)> = vec![("query", title.to_string())];
        if let Some(y) = year {
            params.push(("first_air_date_year", y.to_string()));
        }
        let body = self.cached_get("/search/tv", &params, cancel).await?;
        let parsed: SearchResponse<TmdbSeriesSummary> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(10)
            .map(|s| CandidateSnapshot {
                source: CatalogSource::Tmdb,
                external_id: s.id.to_string(),
                title: s.name,
                original_title: s.original_name,
                year: year_from_date(&s.first_air_date),
                score: 0.0,
                poster_url: poster_url(&s.poster_path),
                overview: s.overview,
                cast_summary: None,
                duration_seconds: None,
                max_episode_count: None,
                vote_count: s.vote_count,
            })
            .collect())
    }

    async fn get_series_details(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails> {
        let endpoint = format!("/tv/{external_id}");
        let body = self
            .cached_get(&endpoint, &[("append_to_response", "external_ids".to_string())], cancel)
            .await?;
        let parsed: TmdbSeriesDetails = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;

        Ok(MediaDetails {
            external_id: parsed.id.to_string(),
            title: parsed.name,
            original_title: parsed.original_name,
            year: year_from_date(&parsed.first_air_date),
            genres: parsed.genres.into_iter().map(|g| g.name).collect(),
            overview: parsed.overview,
            poster_url: poster_url(&parsed.poster_path),
            director: None,
            cast: Vec::new(),
            duration_seconds: None,
            max_episode_count: parsed.number_of_episodes,
        })
    }

    async fn get_series_external_ids(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<ExternalIds> {
        let endpoint = format!("/tv/{external_id}/external_ids");
        let body = self.cached_get(&endpoint, &[], cancel).await?;
        let parsed: TmdbExternalIds = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;
        Ok(ExternalIds {
            imdb_id: parsed.imdb_id,
            tvdb_id: parsed.tvdb_id.map(|id| id.to_string()),
        })
    }

    async fn get_episode_titles(
        &self,
        series_external_id: &str,
        season: i32,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<EpisodeTitle>> {
        let endpoint = format!("/tv/{series_external_id}/season/{season}");
        let body = self.cached_get(&endpoint, &[], cancel).await?;
        let parsed: TmdbSeason = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tmdb response: {e}")))?;

        Ok(parsed
            .episodes
            .into_iter()
            .map(|e| EpisodeTitle {
                episode: e.episode_number,
                title: e.name,
                overview: e.overview,
                air_date: e.air_date,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_independent() {
        let a = TmdbClient::fingerprint("/search/movie", &[("year", "2020".into()), ("query", "x".into())]);
        let b = TmdbClient::fingerprint("/search/movie", &[("query", "x".into()), ("year", "2020".into())]);
        assert_eq!(a, b);
    }

    #[test]
    fn year_from_date_parses_leading_year() {
        assert_eq!(year_from_date(&Some("1999-03-31".to_string())), Some(1999));
        assert_eq!(year_from_date(&None), None);
    }
}
