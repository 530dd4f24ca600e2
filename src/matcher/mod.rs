//! Matcher (§4.3, C4): chooses the upstream endpoint from a file's
//! `type_hint`, scores the candidates it gets back, and keeps the top-N
//! ranked snapshots a `PendingValidation` embeds.

pub mod normalize;
pub mod score;

pub use score::{rank_candidates, score_candidate, should_auto_validate};

use crate::clients::CatalogClient;
use crate::error::{CoreError, CoreResult};
use crate::models::{CandidateSnapshot, MediaTypeHint, ParsedFilename};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SEARCH_TOP_K: usize = 10;
const RANK_TOP_N: usize = 5;

/// The two upstream catalogs, either of which may be absent (§6: a missing
/// API key disables that source rather than failing startup).
#[derive(Clone, Default)]
pub struct CatalogClients {
    pub tmdb: Option<Arc<dyn CatalogClient>>,
    pub tvdb: Option<Arc<dyn CatalogClient>>,
}

impl CatalogClients {
    #[must_use]
    pub fn new(tmdb: Option<Arc<dyn CatalogClient>>, tvdb: Option<Arc<dyn CatalogClient>>) -> Self {
        Self { tmdb, tvdb }
    }

    async fn search(
        &self,
        parsed: &ParsedFilename,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        let mut results = match parsed.type_hint {
            MediaTypeHint::Movie => {
                let client = self
                    .tmdb
                    .as_ref()
                    .ok_or_else(|| CoreError::InvalidInput("no tmdb client configured".to_string()))?;
                client.search_movies(&parsed.title, parsed.year, cancel).await?
            }
            MediaTypeHint::Series => {
                let mut results = if let Some(tmdb) = &self.tmdb {
                    tmdb.search_series(&parsed.title, parsed.year, cancel).await?
                } else {
                    Vec::new()
                };
                if results.is_empty() {
                    if let Some(tvdb) = &self.tvdb {
                        results = tvdb.search_series(&parsed.title, parsed.year, cancel).await?;
                    }
                }
                if self.tmdb.is_none() && self.tvdb.is_none() {
                    return Err(CoreError::InvalidInput(
                        "no tmdb or tvdb client configured".to_string(),
                    ));
                }
                results
            }
            MediaTypeHint::Unknown => {
                return Err(CoreError::InvalidInput(
                    "cannot match a file with an unresolved type hint".to_string(),
                ));
            }
        };
        results.truncate(SEARCH_TOP_K);
        Ok(results)
    }
}

/// Runs the full scoring pass (§4.3 steps 2–3) for one parsed file: search,
/// score every candidate, and keep the top `RANK_TOP_N` by descending score
/// with each snapshot's `score` field populated.
pub async fn match_candidates(
    parsed: &ParsedFilename,
    local_duration_seconds: Option<f64>,
    catalogs: &CatalogClients,
    cancel: &CancellationToken,
) -> CoreResult<Vec<CandidateSnapshot>> {
    let raw = catalogs.search(parsed, cancel).await?;

    let scored: Vec<(CandidateSnapshot, f64)> = raw
        .into_iter()
        .map(|mut candidate| {
            let points = score_candidate(parsed, &candidate, local_duration_seconds);
            candidate.score = points;
            (candidate, points)
        })
        .collect();

    let ranked = rank_candidates(parsed, scored, RANK_TOP_N);
    Ok(ranked.into_iter().map(|(candidate, _)| candidate).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{EpisodeTitle, ExternalIds, MediaDetails};
    use crate::models::CatalogSource;
    use async_trait::async_trait;

    struct StubClient {
        movies: Vec<CandidateSnapshot>,
    }

    #[async_trait]
    impl CatalogClient for StubClient {
        async fn search_movies(
            &self,
            _title: &str,
            _year: Option<i32>,
            _cancel: &CancellationToken,
        ) -> CoreResult<Vec<CandidateSnapshot>> {
            Ok(self.movies.clone())
        }
        async fn get_movie_details(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<MediaDetails> {
            unimplemented!()
        }
        async fn find_by_external_id(
            &self,
            _id: &str,
            _cancel: &CancellationToken,
        ) -> CoreResult<Option<MediaDetails>> {
            unimplemented!()
        }
        async fn search_series(
            &self,
            _title: &str,
            _year: Option<i32>,
            _cancel: &CancellationToken,
        ) -> CoreResult<Vec<CandidateSnapshot>> {
            Ok(Vec::new())
        }
        async fn get_series_details(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<MediaDetails> {
            unimplemented!()
        }
        async fn get_series_external_ids(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<ExternalIds> {
            unimplemented!()
        }
        async fn get_episode_titles(
            &self,
            _id: &str,
            _season: i32,
            _cancel: &CancellationToken,
        ) -> CoreResult<Vec<EpisodeTitle>> {
            unimplemented!()
        }
    }

    fn candidate(id: &str, title: &str, year: i32) -> CandidateSnapshot {
        CandidateSnapshot {
            source: CatalogSource::Tmdb,
            external_id: id.to_string(),
            title: title.to_string(),
            original_title: None,
            year: Some(year),
            score: 0.0,
            poster_url: None,
            overview: None,
            cast_summary: None,
            duration_seconds: Some(136.0 * 60.0),
            max_episode_count: None,
            vote_count: 0,
        }
    }

    fn parsed_movie(title: &str, year: Option<i32>) -> ParsedFilename {
        ParsedFilename {
            title: title.to_string(),
            year,
            season: None,
            episode: None,
            episode_end: None,
            type_hint: MediaTypeHint::Movie,
            resolution: None,
            source: None,
            video_codec: None,
            is_multi_part: false,
        }
    }

    #[tokio::test]
    async fn match_candidates_scores_and_ranks() {
        let parsed = parsed_movie("The Matrix", Some(1999));
        let catalogs = CatalogClients::new(
            Some(Arc::new(StubClient {
                movies: vec![candidate("603", "The Matrix", 1999)],
            })),
            None,
        );

        let ranked = match_candidates(&parsed, Some(136.0 * 60.0), &catalogs, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].score >= 85.0);
    }

    #[tokio::test]
    async fn unknown_type_hint_is_rejected() {
        let mut parsed = parsed_movie("random_home_video", None);
        parsed.type_hint = MediaTypeHint::Unknown;
        let catalogs = CatalogClients::default();
        let result = match_candidates(&parsed, None, &catalogs, &CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn movie_search_without_tmdb_client_errors() {
        let parsed = parsed_movie("Anything", None);
        let catalogs = CatalogClients::default();
        let result = match_candidates(&parsed, None, &catalogs, &CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
