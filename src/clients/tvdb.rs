//! TVDB catalog client (§4.2): series search/details. TVDB v4 authenticates
//! with a short-lived bearer token obtained from an API key via `/login`,
//! unlike TMDB's query-param key, so this client caches the token alongside
//! the rate limiter/retry/cache machinery shared with `tmdb`.

use crate::clients::cache::MemoryCache;
use crate::clients::rate_limiter::{retry_async, RateLimitedClient, ResponseExt, RetryConfig};
use crate::clients::{CatalogClient, EpisodeTitle, ExternalIds, MediaDetails};
use crate::db::Store;
use crate::error::{CoreError, CoreResult};
use crate::models::{CandidateSnapshot, CatalogSource};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://api4.thetvdb.com/v4";

pub struct TvdbClient {
    rate: RateLimitedClient,
    memory: MemoryCache,
    store: Store,
    api_key: String,
    retry: RetryConfig,
    token: Mutex<Option<String>>,
}

impl TvdbClient {
    #[must_use]
    pub fn new(api_key: String, store: Store) -> Self {
        Self {
            rate: RateLimitedClient::for_tvdb(),
            memory: MemoryCache::default(),
            store,
            api_key,
            retry: RetryConfig::default(),
            token: Mutex::new(None),
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
        let key = format!("tvdb:{endpoint}?{joined}");
        format!("{:016x}", xxhash_rust::xxh3::xxh3_64(key.as_bytes()))
    }

    async fn login(&self, cancel: &CancellationToken) -> CoreResult<String> {
        let url = format!("{BASE_URL}/login");
        let body = serde_json::json!({ "apikey": self.api_key });

        let response = retry_async(
            || async {
                tokio::select! {
                    () = cancel.cancelled() => Err(CoreError::Cancelled),
                    result = self.rate.login_post(&url, &body) => result,
                }
            },
            &self.retry,
            "tvdb_login",
            cancel,
        )
        .await?;

        #[derive(Deserialize)]
        struct LoginData {
            token: String,
        }
        #[derive(Deserialize)]
        struct LoginResponse {
            data: LoginData,
        }

        let parsed: LoginResponse = serde_json::from_str(&response)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb login response: {e}")))?;
        Ok(parsed.data.token)
    }

    async fn bearer_token(&self, cancel: &CancellationToken) -> CoreResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login(cancel).await?;
        *guard = Some(token.clone());
        Ok(token)
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

        let body = retry_async(
            || async {
                let token = self.bearer_token(cancel).await?;
                let auth_header = format!("Bearer {token}");
                let response = self
                    .rate
                    .get_with_query(&url, params, &[("Authorization", auth_header.as_str())], cancel)
                    .await?;

                if response.status().as_u16() == 401 {
                    *self.token.lock().await = None;
                    return Err(CoreError::ExternalTransient("tvdb token expired".to_string()));
                }
                if response.is_rate_limited() {
                    return Err(CoreError::ExternalRateLimited("tvdb".to_string()));
                }
                if response.is_transient_error() {
                    return Err(CoreError::ExternalTransient(format!(
                        "tvdb {}",
                        response.status()
                    )));
                }
                if !response.status().is_success() {
                    return Err(CoreError::ExternalPermanent(format!(
                        "tvdb {}",
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
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TvdbSeriesSearchResult {
    tvdb_id: String,
    name: String,
    #[serde(default)]
    translations: Option<serde_json::Value>,
    year: Option<String>,
    image_url: Option<String>,
    overview: Option<String>,
}

#[derive(Deserialize)]
struct TvdbSeriesBase {
    id: i64,
    name: String,
    #[serde(rename = "firstAired")]
    first_aired: Option<String>,
    overview: Option<String>,
    image: Option<String>,
    #[serde(default)]
    genres: Vec<TvdbGenre>,
    #[serde(rename = "remoteIds", default)]
    remote_ids: Vec<TvdbRemoteId>,
    #[serde(default)]
    episodes: Vec<TvdbEpisode>,
}

#[derive(Deserialize)]
struct TvdbGenre {
    name: String,
}

#[derive(Deserialize)]
struct TvdbRemoteId {
    id: String,
    #[serde(rename = "sourceName")]
    source_name: String,
}

#[derive(Deserialize)]
struct TvdbEpisode {
    #[serde(rename = "seasonNumber")]
    season_number: i32,
    number: i32,
    name: Option<String>,
    overview: Option<String>,
    aired: Option<String>,
}

fn parse_year(year: &Option<String>) -> Option<i32> {
    year.as_deref()?.parse().ok()
}

#[async_trait]
impl CatalogClient for TvdbClient {
    async fn search_movies(
        &self,
        _title: &str,
        _year: Option<i32>,
        _cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        Err(CoreError::InvalidInput(
            "tvdb client does not support movie search; use tmdb".to_string(),
        ))
    }

    async fn get_movie_details(
        &self,
        _external_id: &str,
        _cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails> {
        Err(CoreError::InvalidInput(
            "tvdb client does not support movie details; use tmdb".to_string(),
        ))
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<MediaDetails>> {
        let endpoint = "/search/remoteid";
        let body = self
            .cached_get(endpoint, &[("remoteId", external_id.to_string())], cancel)
            .await?;
        let parsed: Envelope<Vec<TvdbSeriesSearchResult>> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb response: {e}")))?;
        let Some(first) = parsed.data.into_iter().next() else {
            return Ok(None);
        };
        self.get_series_details(&first.tvdb_id, cancel).await.map(Some)
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        let mut params: Vec<(&str, String)> =
            vec![("query", title.to_string()), ("type", "series".to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }
        let body = self.cached_get("/search", &params, cancel).await?;
        let parsed: Envelope<Vec<TvdbSeriesSearchResult>> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb response: {e}")))?;

        Ok(parsed
            .data
            .into_iter()
            .take(10)
            .map(|s| CandidateSnapshot {
                source: CatalogSource::Tvdb,
                external_id: s.tvdb_id,
                title: s.name,
                original_title: None,
                year: parse_year(&s.year),
                score: 0.0,
                poster_url: s.image_url,
                overview: s.overview,
                cast_summary: None,
                duration_seconds: None,
                max_episode_count: None,
                // TVDB's search endpoint carries no popularity signal equivalent to
                // TMDB's vote_count; tie-breaking falls through to external id.
                vote_count: 0,
            })
            .collect())
    }

    async fn get_series_details(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<MediaDetails> {
        let endpoint = format!("/series/{external_id}/extended");
        let body = self.cached_get(&endpoint, &[], cancel).await?;
        let parsed: Envelope<TvdbSeriesBase> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb response: {e}")))?;

        let max_episode_count = parsed
            .data
            .episodes
            .iter()
            .filter(|e| e.season_number > 0)
            .map(|e| e.season_number)
            .max()
            .and_then(|max_season| {
                parsed
                    .data
                    .episodes
                    .iter()
                    .filter(|e| e.season_number == max_season)
                    .map(|e| e.number)
                    .max()
            });

        Ok(MediaDetails {
            external_id: parsed.data.id.to_string(),
            title: parsed.data.name,
            original_title: None,
            year: parsed.data.first_aired.as_deref().and_then(|d| d.get(0..4)?.parse().ok()),
            genres: parsed.data.genres.into_iter().map(|g| g.name).collect(),
            overview: parsed.data.overview,
            poster_url: parsed.data.image,
            director: None,
            cast: Vec::new(),
            duration_seconds: None,
            max_episode_count,
        })
    }

    async fn get_series_external_ids(
        &self,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<ExternalIds> {
        let endpoint = format!("/series/{external_id}/extended");
        let body = self.cached_get(&endpoint, &[], cancel).await?;
        let parsed: Envelope<TvdbSeriesBase> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb response: {e}")))?;

        let imdb_id = parsed
            .data
            .remote_ids
            .iter()
            .find(|r| r.source_name.eq_ignore_ascii_case("imdb"))
            .map(|r| r.id.clone());

        Ok(ExternalIds {
            imdb_id,
            tvdb_id: Some(parsed.data.id.to_string()),
        })
    }

    async fn get_episode_titles(
        &self,
        series_external_id: &str,
        season: i32,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<EpisodeTitle>> {
        let endpoint = format!("/series/{series_external_id}/extended");
        let body = self.cached_get(&endpoint, &[], cancel).await?;
        let parsed: Envelope<TvdbSeriesBase> = serde_json::from_str(&body)
            .map_err(|e| CoreError::ExternalPermanent(format!("tvdb response: {e}")))?;

        Ok(parsed
            .data
            .episodes
            .into_iter()
            .filter(|e| e.season_number == season)
            .map(|e| EpisodeTitle {
                episode: e.number,
                title: e.name.unwrap_or_default(),
                overview: e.overview,
                air_date: e.aired,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_year_handles_missing() {
        assert_eq!(parse_year(&Some("2012".to_string())), Some(2012));
        assert_eq!(parse_year(&None), None);
    }

    #[test]
    fn fingerprint_includes_endpoint() {
        let a = TvdbClient::fingerprint("/series/1", &[]);
        let b = TvdbClient::fingerprint("/series/2", &[]);
        assert_ne!(a, b);
    }
}
