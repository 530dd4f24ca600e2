//! End-to-end coverage over the ingestion pipeline: scan -> match -> persist
//! -> auto-validate -> transfer, plus the validation cascade and trash
//! restore round trip. No HTTP layer in this crate, so these drive the
//! services directly against an in-memory store and a stub catalog client,
//! the same shape the unit tests inside each service module use.

use async_trait::async_trait;
use cinevault::clients::{CatalogClient, EpisodeTitle, ExternalIds, MediaDetails};
use cinevault::db::Store;
use cinevault::error::CoreResult;
use cinevault::matcher::CatalogClients;
use cinevault::models::{CandidateSnapshot, CatalogSource, MediaTypeHint};
use cinevault::scanner::ScannerConfig;
use cinevault::services::association_checker::{AssociationChecker, EntityKind};
use cinevault::services::quality_scan_cache::QualityScanCache;
use cinevault::services::transfer_service::{TransferEvent, TransferService};
use cinevault::services::validation_service::ValidationService;
use cinevault::services::workflow::WorkflowOrchestrator;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

struct StubCatalog {
    series_episode_count: i32,
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        _cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        Ok(vec![CandidateSnapshot {
            source: CatalogSource::Tmdb,
            external_id: "603".to_string(),
            title: title.to_string(),
            original_title: None,
            year,
            score: 0.0,
            poster_url: None,
            overview: None,
            cast_summary: None,
            duration_seconds: Some(8160.0),
            max_episode_count: None,
            vote_count: 0,
        }])
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

    async fn search_series(
        &self,
        _title: &str,
        year: Option<i32>,
        _cancel: &CancellationToken,
    ) -> CoreResult<Vec<CandidateSnapshot>> {
        // Deliberately mismatched title so the composite score lands below
        // the auto-validation threshold and both episodes land in review,
        // letting the cascade tests drive acceptance manually.
        Ok(vec![CandidateSnapshot {
            source: CatalogSource::Tmdb,
            external_id: "4607".to_string(),
            title: "Completely Unrelated Show Name".to_string(),
            original_title: None,
            year,
            score: 0.0,
            poster_url: None,
            overview: None,
            cast_summary: None,
            duration_seconds: None,
            max_episode_count: Some(self.series_episode_count),
            vote_count: 0,
        }])
    }

    async fn get_series_details(&self, external_id: &str, _cancel: &CancellationToken) -> CoreResult<MediaDetails> {
        Ok(MediaDetails {
            external_id: external_id.to_string(),
            title: "Lost".to_string(),
            original_title: None,
            year: Some(2004),
            genres: vec!["Drama".to_string()],
            overview: None,
            poster_url: None,
            director: None,
            cast: vec![],
            duration_seconds: None,
            max_episode_count: Some(self.series_episode_count),
        })
    }

    async fn get_series_external_ids(&self, _id: &str, _cancel: &CancellationToken) -> CoreResult<ExternalIds> {
        Ok(ExternalIds::default())
    }

    async fn get_episode_titles(&self, _id: &str, _season: i32, _cancel: &CancellationToken) -> CoreResult<Vec<EpisodeTitle>> {
        Ok(vec![
            EpisodeTitle { episode: 1, title: "Pilot".to_string(), overview: None, air_date: None },
            EpisodeTitle { episode: 2, title: "Tabula Rasa".to_string(), overview: None, air_date: None },
        ])
    }
}

fn write_video(path: &std::path::Path, size: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0_u8; size]).unwrap();
}

#[tokio::test]
async fn scan_match_validate_and_transfer_a_movie_end_to_end() {
    let store = Store::new("sqlite::memory:").await.unwrap();
    let downloads = tempdir().unwrap();
    let storage = tempdir().unwrap();
    let video_dir = tempdir().unwrap();

    let film_path = downloads.path().join("Films/The.Matrix.1999.mkv");
    write_video(&film_path, 200 * 1024 * 1024);

    let catalogs = CatalogClients::new(Some(Arc::new(StubCatalog { series_episode_count: 2 })), None);
    let (event_bus, _) = tokio::sync::broadcast::channel(64);
    let orchestrator = WorkflowOrchestrator::new(store.clone(), catalogs, ScannerConfig::default(), event_bus.clone());

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let cancel = CancellationToken::new();
    let report = orchestrator
        .run(downloads.path().join("Films"), MediaTypeHint::Movie, tx, &cancel)
        .await
        .unwrap();
    drain.await.unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.auto_validated, 1);

    let movie = store.find_movie_by_external_id(Some("603"), None).await.unwrap();
    assert_eq!(movie.unwrap().title, "The Matrix");

    let transfer = TransferService::new(store.clone(), storage.path().to_path_buf(), video_dir.path().to_path_buf(), event_bus);
    let (ttx, mut trx) = tokio::sync::mpsc::channel(64);
    let transfer_drain = tokio::spawn(async move {
        let mut transferred = 0;
        while let Some(event) = trx.recv().await {
            if let TransferEvent::Finished { report } = event {
                transferred = report.transferred;
            }
        }
        transferred
    });

    transfer.execute(false, ttx, &cancel).await.unwrap();
    let transferred = transfer_drain.await.unwrap();
    assert_eq!(transferred, 1);

    let movie = store.find_movie_by_external_id(Some("603"), None).await.unwrap().unwrap();
    let file_path = movie.file_path.expect("transferred movie should have a file_path");
    assert!(std::path::Path::new(&file_path).exists());
}

#[tokio::test]
async fn accepting_one_episode_cascades_auto_validation_to_pending_siblings() {
    let store = Store::new("sqlite::memory:").await.unwrap();
    let downloads = tempdir().unwrap();

    let ep1 = downloads.path().join("Series/Lost (2004)/Season 01/Lost.S01E01.mkv");
    let ep2 = downloads.path().join("Series/Lost (2004)/Season 01/Lost.S01E02.mkv");
    write_video(&ep1, 200 * 1024 * 1024);
    write_video(&ep2, 200 * 1024 * 1024);

    let catalogs = CatalogClients::new(Some(Arc::new(StubCatalog { series_episode_count: 200 })), None);
    let (event_bus, _) = tokio::sync::broadcast::channel(64);
    let orchestrator = WorkflowOrchestrator::new(store.clone(), catalogs.clone(), ScannerConfig::default(), event_bus);

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let cancel = CancellationToken::new();
    let report = orchestrator
        .run(downloads.path().join("Series"), MediaTypeHint::Series, tx, &cancel)
        .await
        .unwrap();
    drain.await.unwrap();

    assert_eq!(report.discovered, 2);

    let pending = store.list_pending().await.unwrap();
    assert_eq!(pending.len(), 2, "the stubbed catalog's mismatched title keeps both episodes below the auto-validate threshold");

    let validation = ValidationService::new(store.clone(), catalogs);
    let first = &pending[0];
    let candidates = Store::decode_candidates(first);
    let chosen = &candidates[0].external_id;

    validation.accept(first.id, chosen, &cancel).await.unwrap();

    let second_id = pending[1].id;
    let second = store.get_pending_validation(second_id).await.unwrap().unwrap();
    assert_eq!(second.status, "validated");
    assert!(second.auto_validated);
    assert_eq!(second.cascade_root, Some(first.id));
}

#[tokio::test]
async fn rejecting_a_cascade_root_reverts_auto_validated_siblings_to_pending() {
    let store = Store::new("sqlite::memory:").await.unwrap();
    let downloads = tempdir().unwrap();

    let ep1 = downloads.path().join("Series/Lost (2004)/Season 01/Lost.S01E01.mkv");
    let ep2 = downloads.path().join("Series/Lost (2004)/Season 01/Lost.S01E02.mkv");
    write_video(&ep1, 200 * 1024 * 1024);
    write_video(&ep2, 200 * 1024 * 1024);

    let catalogs = CatalogClients::new(Some(Arc::new(StubCatalog { series_episode_count: 200 })), None);
    let (event_bus, _) = tokio::sync::broadcast::channel(64);
    let orchestrator = WorkflowOrchestrator::new(store.clone(), catalogs.clone(), ScannerConfig::default(), event_bus);

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let cancel = CancellationToken::new();
    orchestrator
        .run(downloads.path().join("Series"), MediaTypeHint::Series, tx, &cancel)
        .await
        .unwrap();
    drain.await.unwrap();

    let validation = ValidationService::new(store.clone(), catalogs);
    let pending = store.list_pending().await.unwrap();
    let root_id = pending[0].id;
    let candidates = Store::decode_candidates(&pending[0]);
    validation.accept(root_id, &candidates[0].external_id, &cancel).await.unwrap();

    validation.reject(root_id).await.unwrap();

    let root = store.get_pending_validation(root_id).await.unwrap().unwrap();
    assert_eq!(root.status, "rejected");

    let sibling_id = pending[1].id;
    let sibling = store.get_pending_validation(sibling_id).await.unwrap().unwrap();
    assert_eq!(sibling.status, "pending", "sibling should revert to pending once the cascade root is rejected");
}

#[tokio::test]
async fn confirmed_association_is_never_flagged_as_suspicious() {
    let store = Store::new("sqlite::memory:").await.unwrap();

    use cinevault::entities::movies;
    use sea_orm::Set;
    let movie = store
        .save_movie(movies::ActiveModel {
            tmdb_id: Set(Some("603".to_string())),
            imdb_id: Set(None),
            title: Set("The Matrix".to_string()),
            original_title: Set(None),
            year: Set(Some(1999)),
            genres: Set("[]".to_string()),
            duration_seconds: Set(Some(8160.0)),
            overview: Set(None),
            poster_url: Set(None),
            director: Set(None),
            cast: Set("[]".to_string()),
            video_codec: Set(None),
            resolution_label: Set(None),
            audio_channels: Set(None),
            watched: Set(false),
            personal_rating: Set(None),
            file_path: Set(Some("/video/Completely Different Movie.mkv".to_string())),
            created_at: Set("2024-01-01T00:00:00Z".to_string()),
            updated_at: Set("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let (event_bus, _) = tokio::sync::broadcast::channel(64);
    let scan_cache_dir = tempdir().unwrap();
    let scan_cache = Arc::new(QualityScanCache::load(scan_cache_dir.path().join("quality_scan_cache.json")).await.unwrap());
    let checker = AssociationChecker::new(store.clone(), event_bus, scan_cache);
    let cancel = CancellationToken::new();

    let flagged = checker.scan_suspicious(&cancel).await.unwrap();
    assert!(flagged.iter().any(|f| f.entity_id == movie.id), "mismatched title should be flagged before confirmation");

    checker.confirm(EntityKind::Movie, movie.id).await.unwrap();

    let flagged_after = checker.scan_suspicious(&cancel).await.unwrap();
    assert!(!flagged_after.iter().any(|f| f.entity_id == movie.id), "confirmed association must never be flagged again");
}

#[tokio::test]
async fn trash_restore_reinserts_a_soft_deleted_movie_under_its_original_id() {
    let store = Store::new("sqlite::memory:").await.unwrap();

    use cinevault::entities::movies;
    use sea_orm::Set;
    let movie = store
        .save_movie(movies::ActiveModel {
            tmdb_id: Set(Some("27205".to_string())),
            imdb_id: Set(None),
            title: Set("Inception".to_string()),
            original_title: Set(None),
            year: Set(Some(2010)),
            genres: Set("[]".to_string()),
            duration_seconds: Set(None),
            overview: Set(None),
            poster_url: Set(None),
            director: Set(None),
            cast: Set("[]".to_string()),
            video_codec: Set(None),
            resolution_label: Set(None),
            audio_channels: Set(None),
            watched: Set(false),
            personal_rating: Set(None),
            file_path: Set(None),
            created_at: Set("2024-01-01T00:00:00Z".to_string()),
            updated_at: Set("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let movie_id = movie.id;

    store.trash_movie(movie_id).await.unwrap();
    assert!(store.get_movie(movie_id).await.unwrap().is_none());

    let trashed = store.list_trash(Some("Movie")).await.unwrap();
    assert_eq!(trashed.len(), 1);
    let trash_id = trashed[0].id;

    store.restore_from_trash(trash_id).await.unwrap();

    let restored = store.get_movie(movie_id).await.unwrap().expect("movie should be restored under its original id");
    assert_eq!(restored.title, "Inception");
    assert!(store.get_trash_entry(trash_id).await.unwrap().is_none());
}
