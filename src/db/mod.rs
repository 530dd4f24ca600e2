use crate::entities::{episodes, movies, pending_validations, series, trash, video_files};
use crate::error::{CoreError, CoreResult};
use crate::models::{CandidateSnapshot, MediaInfo, ParsedFilename};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Facade over the per-entity repositories (§4.6). Callers see
/// business-named methods; the fan-out into `Movies`/`Series`/`Episodes`/
/// etc. repositories stays an implementation detail, mirroring the
/// teacher's `Store`-over-`*Repository` layering.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> CoreResult<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> CoreResult<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;

        migrator::Migrator::up(&conn, None)
            .await
            .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;

        info!(min_connections, max_connections, "store connected and migrated");

        Ok(Self { conn })
    }

    fn movies(&self) -> repositories::movies::MovieRepository {
        repositories::movies::MovieRepository::new(self.conn.clone())
    }

    fn series(&self) -> repositories::series::SeriesRepository {
        repositories::series::SeriesRepository::new(self.conn.clone())
    }

    fn episodes(&self) -> repositories::episodes::EpisodeRepository {
        repositories::episodes::EpisodeRepository::new(self.conn.clone())
    }

    fn video_files(&self) -> repositories::video_files::VideoFileRepository {
        repositories::video_files::VideoFileRepository::new(self.conn.clone())
    }

    fn pending_validations(&self) -> repositories::pending_validations::PendingValidationRepository {
        repositories::pending_validations::PendingValidationRepository::new(self.conn.clone())
    }

    fn confirmed_associations(
        &self,
    ) -> repositories::confirmed_associations::ConfirmedAssociationRepository {
        repositories::confirmed_associations::ConfirmedAssociationRepository::new(self.conn.clone())
    }

    fn trash(&self) -> repositories::trash::TrashRepository {
        repositories::trash::TrashRepository::new(self.conn.clone())
    }

    pub fn catalog_cache(&self) -> repositories::catalog_cache::CatalogCacheRepository {
        repositories::catalog_cache::CatalogCacheRepository::new(self.conn.clone())
    }

    // ---- Movies ----

    pub async fn get_movie(&self, id: i32) -> CoreResult<Option<movies::Model>> {
        self.movies().get_by_id(id).await
    }

    pub async fn find_movie_by_external_id(
        &self,
        tmdb_id: Option<&str>,
        imdb_id: Option<&str>,
    ) -> CoreResult<Option<movies::Model>> {
        self.movies().get_by_external_id(tmdb_id, imdb_id).await
    }

    pub async fn search_movies(&self, query: &str) -> CoreResult<Vec<movies::Model>> {
        self.movies().search_by_title(query).await
    }

    pub async fn list_movies_watched(&self, watched: bool) -> CoreResult<Vec<movies::Model>> {
        self.movies().list_watched(watched).await
    }

    pub async fn list_all_movies(&self) -> CoreResult<Vec<movies::Model>> {
        self.movies().list_all().await
    }

    pub async fn save_movie(&self, model: movies::ActiveModel) -> CoreResult<movies::Model> {
        self.movies().save(model).await
    }

    pub async fn trash_movie(&self, id: i32) -> CoreResult<()> {
        self.movies().soft_delete_to_trash(id).await
    }

    // ---- Series / Episodes ----

    pub async fn get_series(&self, id: i32) -> CoreResult<Option<series::Model>> {
        self.series().get_by_id(id).await
    }

    pub async fn find_series_by_external_id(
        &self,
        tmdb_id: Option<&str>,
        tvdb_id: Option<&str>,
    ) -> CoreResult<Option<series::Model>> {
        self.series().get_by_external_id(tmdb_id, tvdb_id).await
    }

    pub async fn search_series(&self, query: &str) -> CoreResult<Vec<series::Model>> {
        self.series().search_by_title(query).await
    }

    pub async fn list_all_series(&self) -> CoreResult<Vec<series::Model>> {
        self.series().list_all().await
    }

    pub async fn save_series(&self, model: series::ActiveModel) -> CoreResult<series::Model> {
        self.series().save(model).await
    }

    pub async fn trash_series(&self, id: i32) -> CoreResult<usize> {
        self.series().soft_delete_to_trash(id).await
    }

    pub async fn get_episode(&self, id: i32) -> CoreResult<Option<episodes::Model>> {
        self.episodes().get_by_id(id).await
    }

    pub async fn get_episode_by_natural_key(
        &self,
        series_id: i32,
        season: i32,
        episode: i32,
    ) -> CoreResult<Option<episodes::Model>> {
        self.episodes()
            .get_by_natural_key(series_id, season, episode)
            .await
    }

    pub async fn list_episodes_for_series(&self, series_id: i32) -> CoreResult<Vec<episodes::Model>> {
        self.episodes().list_by_series(series_id).await
    }

    pub async fn save_episode(&self, model: episodes::ActiveModel) -> CoreResult<episodes::Model> {
        self.episodes().save(model).await
    }

    pub async fn update_episode_path(&self, id: i32, path: &str) -> CoreResult<()> {
        self.episodes().update_file_path(id, path).await
    }

    pub async fn trash_episode(&self, id: i32) -> CoreResult<()> {
        self.episodes().soft_delete_to_trash(id).await
    }

    // ---- Video files ----

    #[allow(clippy::too_many_arguments)]
    pub async fn record_scanned_file(
        &self,
        path: &str,
        filename: &str,
        size_bytes: i64,
        file_hash: Option<&str>,
        media_info: Option<&MediaInfo>,
        parsed: &ParsedFilename,
        corrected_location: bool,
    ) -> CoreResult<video_files::Model> {
        self.video_files()
            .record_scan_result(
                path,
                filename,
                size_bytes,
                file_hash,
                media_info,
                parsed,
                corrected_location,
            )
            .await
    }

    pub async fn get_video_file(&self, id: i32) -> CoreResult<Option<video_files::Model>> {
        self.video_files().get_by_id(id).await
    }

    pub async fn get_video_file_by_path(&self, path: &str) -> CoreResult<Option<video_files::Model>> {
        self.video_files().get_by_path(path).await
    }

    pub async fn find_duplicate_by_hash(&self, hash: &str) -> CoreResult<Option<video_files::Model>> {
        self.video_files().get_by_hash(hash).await
    }

    pub async fn update_video_file_path(&self, id: i32, new_path: &str) -> CoreResult<()> {
        self.video_files().update_path(id, new_path).await
    }

    pub async fn backfill_video_file_hash(&self, id: i32, hash: &str) -> CoreResult<()> {
        self.video_files().backfill_hash(id, hash).await
    }

    // ---- Pending validations ----

    pub async fn create_pending_validation(
        &self,
        video_file_id: i32,
        candidates: &[CandidateSnapshot],
        series_group_key: Option<&str>,
    ) -> CoreResult<pending_validations::Model> {
        self.pending_validations()
            .create(video_file_id, candidates, series_group_key)
            .await
    }

    pub async fn get_pending_validation(
        &self,
        id: i32,
    ) -> CoreResult<Option<pending_validations::Model>> {
        self.pending_validations().get_by_id(id).await
    }

    pub async fn list_pending(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.pending_validations().list_by_status("pending").await
    }

    pub async fn list_auto_validated(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.pending_validations().list_auto_validated().await
    }

    pub async fn list_validated(&self) -> CoreResult<Vec<pending_validations::Model>> {
        self.pending_validations().list_by_status("validated").await
    }

    pub async fn list_cascade_siblings(
        &self,
        cascade_root: i32,
    ) -> CoreResult<Vec<pending_validations::Model>> {
        self.pending_validations()
            .list_cascade_siblings(cascade_root)
            .await
    }

    pub async fn list_pending_in_series_group(
        &self,
        series_group_key: &str,
    ) -> CoreResult<Vec<pending_validations::Model>> {
        self.pending_validations()
            .list_pending_by_series_group(series_group_key)
            .await
    }

    pub async fn mark_pending_validated(
        &self,
        id: i32,
        candidate_external_id: &str,
        auto_validated: bool,
        cascade_root: Option<i32>,
    ) -> CoreResult<pending_validations::Model> {
        self.pending_validations()
            .mark_validated(id, candidate_external_id, auto_validated, cascade_root)
            .await
    }

    pub async fn mark_pending_rejected(&self, id: i32) -> CoreResult<pending_validations::Model> {
        self.pending_validations().mark_rejected(id).await
    }

    pub async fn reset_pending_to_pending(
        &self,
        id: i32,
    ) -> CoreResult<pending_validations::Model> {
        self.pending_validations().reset_to_pending(id).await
    }

    #[must_use]
    pub fn decode_candidates(model: &pending_validations::Model) -> Vec<CandidateSnapshot> {
        repositories::pending_validations::PendingValidationRepository::decode_candidates(model)
    }

    // ---- Confirmed associations / Trash ----

    pub async fn confirm_association(&self, entity_type: &str, entity_id: i32) -> CoreResult<()> {
        self.confirmed_associations().confirm(entity_type, entity_id).await
    }

    pub async fn is_association_confirmed(
        &self,
        entity_type: &str,
        entity_id: i32,
    ) -> CoreResult<bool> {
        self.confirmed_associations()
            .is_confirmed(entity_type, entity_id)
            .await
    }

    pub async fn list_trash(&self, entity_type: Option<&str>) -> CoreResult<Vec<trash::Model>> {
        self.trash().list(entity_type).await
    }

    pub async fn get_trash_entry(&self, id: i32) -> CoreResult<Option<trash::Model>> {
        self.trash().get(id).await
    }

    pub async fn remove_trash_entry(&self, id: i32) -> CoreResult<()> {
        self.trash().remove(id).await
    }

    /// Re-inserts the snapshot held by a `Trash` row and removes the row
    /// (§3: "Trash... supports restore"). The row's `entity_type` selects
    /// which model the opaque JSON payload deserializes into; the restored
    /// row keeps its original id.
    pub async fn restore_from_trash(&self, trash_id: i32) -> CoreResult<()> {
        use crate::entities::prelude::{Episodes, Movies, Series};
        use sea_orm::EntityTrait;

        let entry = self
            .get_trash_entry(trash_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("trash entry {trash_id}")))?;

        match entry.entity_type.as_str() {
            "Movie" => {
                let model: movies::Model = serde_json::from_str(&entry.payload)
                    .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
                let am: movies::ActiveModel = model.into();
                Movies::insert(am).exec(&self.conn).await?;
            }
            "Series" => {
                let model: series::Model = serde_json::from_str(&entry.payload)
                    .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
                let am: series::ActiveModel = model.into();
                Series::insert(am).exec(&self.conn).await?;
            }
            "Episode" => {
                let model: episodes::Model = serde_json::from_str(&entry.payload)
                    .map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
                let am: episodes::ActiveModel = model.into();
                Episodes::insert(am).exec(&self.conn).await?;
            }
            other => {
                return Err(CoreError::InvalidInput(format!(
                    "trash entry {trash_id} has unrestorable entity_type {other}"
                )))
            }
        }

        self.trash().remove(trash_id).await
    }
}
