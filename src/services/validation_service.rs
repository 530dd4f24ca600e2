//! Validation Service (§4.4, C6): accept/reject/reset pending items, with
//! series cascade so accepting one episode auto-validates its siblings
//! against the same series. Operations serialize per `pending_id` through
//! `KeyedLocks`; plain reads (`list_*`) take no lock.

use crate::clients::MediaDetails;
use crate::db::Store;
use crate::entities::{episodes, movies, pending_validations, series};
use crate::error::{CoreError, CoreResult};
use crate::matcher::CatalogClients;
use crate::models::{CandidateSnapshot, CatalogSource, MediaInfo, MediaTypeHint, ParsedFilename};
use crate::services::KeyedLocks;
use sea_orm::Set;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct ValidationService {
    store: Store,
    catalogs: CatalogClients,
    locks: KeyedLocks<i32>,
}

impl ValidationService {
    #[must_use]
    pub fn new(store: Store, catalogs: CatalogClients) -> Self {
        Self {
            store,
            catalogs,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn list_pending(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.store.list_pending().await
    }

    pub async fn list_auto_validated(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.store.list_auto_validated().await
    }

    pub async fn list_validated(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.store.list_validated().await
    }

    /// Re-invokes the catalog search without persisting anything; the
    /// operator calls `accept` separately once a candidate looks right.
    pub async fn search_manual(
        &self,
        query: &str,
        type_hint: MediaTypeHint,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        match type_hint {
            MediaTypeHint::Movie => {
                let client = self
                    .catalogs
                    .tmdb
                    .as_ref()
                    .ok_or_else(|| CoreError::InvalidInput("no tmdb client configured".to_string()))?;
                client.search_movies(query, year, cancel).await
            }
            MediaTypeHint::Series => {
                let mut results = if let Some(tmdb) = &self.catalogs.tmdb {
                    tmdb.search_series(query, year, cancel).await?
                } else {
                    Vec::new()
                };
                if results.is_empty() {
                    if let Some(tvdb) = &self.catalogs.tvdb {
                        results = tvdb.search_series(query, year, cancel).await?;
                    }
                }
                Ok(results)
            }
            MediaTypeHint::Unknown => Err(CoreError::InvalidInput(
                "search_manual requires a Movie or Series type hint".to_string(),
            )),
        }
    }

    pub async fn search_by_external_id(
        &self,
        source: CatalogSource,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<MediaDetails>> {
        self.client_for(source)?.find_by_external_id(external_id, cancel).await
    }

    /// Materializes the chosen candidate into a `Movie`/`Episode`, marks
    /// the item Validated, and, for series, cascades the same acceptance
    /// to pending siblings whose candidate list contains the same series.
    pub async fn accept(
        &self,
        pending_id: i32,
        candidate_external_id: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<pending_validations::Model> {
        let _guard = self.locks.lock(pending_id).await;

        let pending = self
            .store
            .get_pending_validation(pending_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {pending_id}")))?;

        let candidates = Store::decode_candidates(&pending);
        let candidate = candidates
            .into_iter()
            .find(|c| c.external_id == candidate_external_id)
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "candidate {candidate_external_id} on pending_validation {pending_id}"
                ))
            })?;

        let parsed = self.parsed_filename_for(&pending).await?;
        self.materialize_and_validate(&pending, &candidate, &parsed, false, None, cancel)
            .await?;

        let updated = self
            .store
            .get_pending_validation(pending_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {pending_id}")))?;

        drop(_guard);

        if matches!(parsed.type_hint, MediaTypeHint::Series) {
            self.cascade_series(pending_id, &candidate, cancel).await?;
        }

        Ok(updated)
    }

    pub async fn reject(&self, pending_id: i32) -> CoreResult<pending_validations::Model> {
        let _guard = self.locks.lock(pending_id).await;
        self.revert_cascade_siblings(pending_id).await?;
        self.store.mark_pending_rejected(pending_id).await
    }

    pub async fn reset_to_pending(&self, pending_id: i32) -> CoreResult<pending_validations::Model> {
        let _guard = self.locks.lock(pending_id).await;
        self.revert_cascade_siblings(pending_id).await?;
        self.store.reset_pending_to_pending(pending_id).await
    }

    async fn revert_cascade_siblings(&self, root_id: i32) -> CoreResult<()> {
        let siblings = self.store.list_cascade_siblings(root_id).await?;
        for sibling in siblings {
            let _sibling_guard = self.locks.lock(sibling.id).await;
            if let Err(e) = self.store.reset_pending_to_pending(sibling.id).await {
                warn!(sibling_id = sibling.id, root_id, error = %e, "cascade: failed to revert sibling to pending");
            }
        }
        Ok(())
    }

    async fn cascade_series(
        &self,
        root_id: i32,
        accepted_candidate: &CandidateSnapshot,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let root = self
            .store
            .get_pending_validation(root_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("pending_validation {root_id}")))?;
        let Some(series_group_key) = root.series_group_key.clone() else {
            return Ok(());
        };

        let siblings = self.store.list_pending_in_series_group(&series_group_key).await?;
        for sibling in siblings {
            if sibling.id == root_id {
                continue;
            }
            let _guard = self.locks.lock(sibling.id).await;

            let Some(fresh) = self.store.get_pending_validation(sibling.id).await? else {
                continue;
            };
            if fresh.status != "pending" {
                continue;
            }

            let candidates = Store::decode_candidates(&fresh);
            let Some(matching) = candidates
                .iter()
                .find(|c| c.external_id == accepted_candidate.external_id)
                .cloned()
            else {
                continue;
            };

            let Ok(parsed) = self.parsed_filename_for(&fresh).await else {
                continue;
            };
            if parsed.episode.is_none() {
                continue;
            }

            if let Err(e) = self
                .materialize_and_validate(&fresh, &matching, &parsed, true, Some(root_id), cancel)
                .await
            {
                warn!(sibling_id = fresh.id, root_id, error = %e, "cascade: failed to auto-validate sibling");
            }
        }
        Ok(())
    }

    async fn parsed_filename_for(&self, pending: &pending_validations::Model) -> CoreResult<ParsedFilename> {
        let video_file = self
            .store
            .get_video_file(pending.video_file_id)
            .await?
            .ok_or_else(|| {
                CoreError::StoreConsistency(format!(
                    "video_file {} missing for pending_validation {}",
                    pending.video_file_id, pending.id
                ))
            })?;
        serde_json::from_str(&video_file.parsed).map_err(|e| CoreError::StoreConsistency(e.to_string()))
    }

    /// Reads back the `MediaInfo` recorded for the scanned file behind a
    /// pending item, so it can be persisted onto the materialized
    /// Movie/Episode alongside the catalog metadata.
    async fn media_info_for(&self, pending: &pending_validations::Model) -> CoreResult<Option<MediaInfo>> {
        let video_file = self
            .store
            .get_video_file(pending.video_file_id)
            .await?
            .ok_or_else(|| {
                CoreError::StoreConsistency(format!(
                    "video_file {} missing for pending_validation {}",
                    pending.video_file_id, pending.id
                ))
            })?;
        Ok(video_file
            .media_info
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok()))
    }

    async fn materialize_and_validate(
        &self,
        pending: &pending_validations::Model,
        candidate: &CandidateSnapshot,
        parsed: &ParsedFilename,
        auto_validated: bool,
        cascade_root: Option<i32>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let media_info = self.media_info_for(pending).await?;

        match parsed.type_hint {
            MediaTypeHint::Movie => {
                self.materialize_movie(candidate, media_info.as_ref(), cancel).await?;
            }
            MediaTypeHint::Series => {
                self.materialize_episode(candidate, parsed, media_info.as_ref(), cancel).await?;
            }
            MediaTypeHint::Unknown => {
                return Err(CoreError::InvalidInput(
                    "cannot accept a candidate for an unresolved type hint".to_string(),
                ));
            }
        }
        self.store
            .mark_pending_validated(pending.id, &candidate.external_id, auto_validated, cascade_root)
            .await?;
        Ok(())
    }

    fn client_for(&self, source: CatalogSource) -> CoreResult<&std::sync::Arc<dyn crate::clients::CatalogClient>> {
        let client = match source {
            CatalogSource::Tmdb | CatalogSource::Imdb => self.catalogs.tmdb.as_ref(),
            CatalogSource::Tvdb => self.catalogs.tvdb.as_ref(),
        };
        client.ok_or_else(|| CoreError::InvalidInput(format!("no client configured for {source:?}")))
    }

    async fn materialize_movie(
        &self,
        candidate: &CandidateSnapshot,
        media_info: Option<&MediaInfo>,
        cancel: &CancellationToken,
    ) -> CoreResult<movies::Model> {
        let client = self.client_for(candidate.source)?;
        let details = client.get_movie_details(&candidate.external_id, cancel).await?;

        let (tmdb_id, imdb_id) = match candidate.source {
            CatalogSource::Tmdb => (Some(details.external_id.clone()), None),
            CatalogSource::Imdb => (None, Some(details.external_id.clone())),
            CatalogSource::Tvdb => (None, None),
        };

        let existing = self
            .store
            .find_movie_by_external_id(tmdb_id.as_deref(), imdb_id.as_deref())
            .await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut am: movies::ActiveModel = match existing {
            Some(model) => model.into(),
            None => movies::ActiveModel {
                watched: Set(false),
                personal_rating: Set(None),
                video_codec: Set(None),
                resolution_label: Set(None),
                audio_channels: Set(None),
                file_path: Set(None),
                created_at: Set(now.clone()),
                ..Default::default()
            },
        };

        am.tmdb_id = Set(tmdb_id);
        am.imdb_id = Set(imdb_id);
        am.title = Set(details.title);
        am.original_title = Set(details.original_title);
        am.year = Set(details.year);
        am.genres = Set(serde_json::to_string(&details.genres).unwrap_or_default());
        am.duration_seconds = Set(details.duration_seconds);
        am.overview = Set(details.overview);
        am.poster_url = Set(details.poster_url);
        am.director = Set(details.director);
        am.cast = Set(serde_json::to_string(&details.cast).unwrap_or_default());
        if let Some(info) = media_info {
            am.video_codec = Set(Some(info.video_codec.clone()));
            am.resolution_label = Set(Some(info.resolution_str().to_string()));
            am.audio_channels = Set(info.audio_channels.clone());
        }
        am.updated_at = Set(now);

        self.store.save_movie(am).await
    }

    async fn materialize_series(
        &self,
        candidate: &CandidateSnapshot,
        cancel: &CancellationToken,
    ) -> CoreResult<series::Model> {
        let client = self.client_for(candidate.source)?;
        let details = client.get_series_details(&candidate.external_id, cancel).await?;
        let external_ids = client
            .get_series_external_ids(&candidate.external_id, cancel)
            .await
            .unwrap_or_default();

        let (tmdb_id, tvdb_id) = match candidate.source {
            CatalogSource::Tmdb => (Some(details.external_id.clone()), None),
            CatalogSource::Tvdb => (None, Some(details.external_id.clone())),
            CatalogSource::Imdb => (None, None),
        };

        let existing = self
            .store
            .find_series_by_external_id(tmdb_id.as_deref(), tvdb_id.as_deref())
            .await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut am: series::ActiveModel = match existing {
            Some(model) => model.into(),
            None => series::ActiveModel {
                watched: Set(false),
                personal_rating: Set(None),
                created_by: Set(None),
                created_at: Set(now.clone()),
                ..Default::default()
            },
        };

        am.tmdb_id = Set(tmdb_id);
        am.tvdb_id = Set(tvdb_id);
        am.imdb_id = Set(external_ids.imdb_id);
        am.title = Set(details.title);
        am.original_title = Set(details.original_title);
        am.year = Set(details.year);
        am.genres = Set(serde_json::to_string(&details.genres).unwrap_or_default());
        am.overview = Set(details.overview);
        am.poster_url = Set(details.poster_url);
        am.cast = Set(serde_json::to_string(&details.cast).unwrap_or_default());
        am.updated_at = Set(now);

        self.store.save_series(am).await
    }

    async fn materialize_episode(
        &self,
        candidate: &CandidateSnapshot,
        parsed: &ParsedFilename,
        media_info: Option<&MediaInfo>,
        cancel: &CancellationToken,
    ) -> CoreResult<episodes::Model> {
        let series_model = self.materialize_series(candidate, cancel).await?;
        let season = parsed.season.unwrap_or(1);
        let episode_number = parsed.episode.ok_or_else(|| {
            CoreError::InvalidInput("series candidate accepted without a parsed episode number".to_string())
        })?;

        let client = self.client_for(candidate.source)?;
        let episode_title = client
            .get_episode_titles(&candidate.external_id, season, cancel)
            .await
            .ok()
            .and_then(|titles| titles.into_iter().find(|t| t.episode == episode_number));

        let existing = self
            .store
            .get_episode_by_natural_key(series_model.id, season, episode_number)
            .await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut am: episodes::ActiveModel = match existing {
            Some(model) => model.into(),
            None => episodes::ActiveModel {
                series_id: Set(series_model.id),
                season_number: Set(season),
                episode_number: Set(episode_number),
                video_codec: Set(None),
                resolution_label: Set(None),
                audio_channels: Set(None),
                duration_seconds: Set(None),
                file_path: Set(None),
                created_at: Set(now.clone()),
                ..Default::default()
            },
        };

        if let Some(t) = episode_title {
            am.title = Set(Some(t.title));
            am.overview = Set(t.overview);
            am.air_date = Set(t.air_date);
        }
        if let Some(info) = media_info {
            am.video_codec = Set(Some(info.video_codec.clone()));
            am.resolution_label = Set(Some(info.resolution_str().to_string()));
            am.audio_channels = Set(info.audio_channels.clone());
            am.duration_seconds = Set(Some(info.duration_seconds));
        }
        am.updated_at = Set(now);

        self.store.save_episode(am).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CatalogClient, EpisodeTitle, ExternalIds};
    use crate::db::Store;
    use crate::models::MediaTypeHint;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubTmdb;

    #[async_trait]
    impl CatalogClient for StubTmdb {
        async fn search_movies(
            &self,
            _title: &str,
            _year: Option<i32>,
            _cancel: &CancellationToken,
        ) -> CoreResult<Vec<CandidateSnapshot>> {
            Ok(Vec::new())
        }

        async fn get_movie_details(&self, external_id: &str, _cancel: &CancellationToken) -> CoreResult<MediaDetails> {
            Ok(MediaDetails {
                external_id: external_id.to_string(),
                title: "The Matrix".to_string(),
                original_title: None,
                year: Some(1999),
                genres: vec!["Action".to_string()],
                overview: Some("A hacker learns the truth.".to_string()),
                poster_url: None,
                director: Some("The Wachowskis".to_string()),
                cast: vec!["Keanu Reeves".to_string()],
                duration_seconds: Some(8160.0),
                max_episode_count: None,
            })
        }

        async fn find_by_external_id(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<Option<MediaDetails>> {
            Ok(None)
        }

        async fn search_series(&self, _title: &str, _year: Option<i32>, _cancel: &CancellationToken) -> CoreResult<Vec<CandidateSnapshot>> {
            Ok(Vec::new())
        }

        async fn get_series_details(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<MediaDetails> {
            unimplemented!()
        }

        async fn get_series_external_ids(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<ExternalIds> {
            unimplemented!()
        }

        async fn get_episode_titles(&self, _id: &str, _season: i32, _cancel: &CancellationToken) -> CoreResult<Vec<EpisodeTitle>> {
            unimplemented!()
        }
    }

    async fn test_store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    fn candidate(id: &str) -> CandidateSnapshot {
        CandidateSnapshot {
            source: CatalogSource::Tmdb,
            external_id: id.to_string(),
            title: "The Matrix".to_string(),
            original_title: None,
            year: Some(1999),
            score: 95.0,
            poster_url: None,
            overview: None,
            cast_summary: None,
            duration_seconds: Some(8160.0),
            max_episode_count: None,
            vote_count: 0,
        }
    }

    fn parsed_movie() -> ParsedFilename {
        ParsedFilename {
            title: "The Matrix".to_string(),
            year: Some(1999),
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
    async fn accept_materializes_movie_and_marks_validated() {
        let store = test_store().await;
        let video_file = store
            .record_scanned_file(
                "/downloads/The.Matrix.1999.mkv",
                "The.Matrix.1999.mkv",
                9_000_000_000,
                None,
                None,
                &parsed_movie(),
                false,
            )
            .await
            .unwrap();
        let pending = store
            .create_pending_validation(video_file.id, &[candidate("603")], None)
            .await
            .unwrap();

        let catalogs = CatalogClients::new(Some(Arc::new(StubTmdb)), None);
        let service = ValidationService::new(store.clone(), catalogs);

        let updated = service.accept(pending.id, "603", &CancellationToken::new()).await.unwrap();
        assert_eq!(updated.status, "validated");
        assert_eq!(updated.selected_candidate_id.as_deref(), Some("603"));

        let movie = store.find_movie_by_external_id(Some("603"), None).await.unwrap();
        assert!(movie.is_some());
        assert_eq!(movie.unwrap().title, "The Matrix");
    }

    #[tokio::test]
    async fn reject_leaves_selection_empty() {
        let store = test_store().await;
        let video_file = store
            .record_scanned_file(
                "/downloads/Unknown.Film.2021.mkv",
                "Unknown.Film.2021.mkv",
                9_000_000_000,
                None,
                None,
                &parsed_movie(),
                false,
            )
            .await
            .unwrap();
        let pending = store
            .create_pending_validation(video_file.id, &[candidate("999")], None)
            .await
            .unwrap();

        let catalogs = CatalogClients::new(Some(Arc::new(StubTmdb)), None);
        let service = ValidationService::new(store, catalogs);

        let rejected = service.reject(pending.id).await.unwrap();
        assert_eq!(rejected.status, "rejected");
        assert!(rejected.selected_candidate_id.is_none());
    }
}
