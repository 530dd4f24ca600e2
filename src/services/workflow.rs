//! Workflow Orchestrator (C9, §5): drives scan → match → persist →
//! auto-validate for both ingestion roots, emitting progress events and
//! honoring cancellation at every suspension point.

use crate::db::Store;
use crate::domain::NotificationEvent;
use crate::error::{CoreError, CoreResult};
use crate::fs_port;
use crate::matcher::{self, should_auto_validate, CatalogClients};
use crate::matcher::normalize::sort_key;
use crate::models::MediaTypeHint;
use crate::parser::media::extract_media_info;
use crate::scanner::{self, ScanResult, ScannerConfig};
use crate::services::validation_service::ValidationService;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub enum WorkflowEvent {
    Started { root: PathBuf },
    FileDiscovered { filename: String },
    FileAutoValidated { filename: String, title: String },
    FileQueuedForReview { filename: String },
    FileSkipped { filename: String, reason: String },
    RootFinished { root: PathBuf },
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowReport {
    pub discovered: usize,
    pub auto_validated: usize,
    pub queued_for_review: usize,
    pub skipped: usize,
}

pub struct WorkflowOrchestrator {
    store: Store,
    catalogs: CatalogClients,
    validation: ValidationService,
    scanner_config: ScannerConfig,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl WorkflowOrchestrator {
    #[must_use]
    pub fn new(
        store: Store,
        catalogs: CatalogClients,
        scanner_config: ScannerConfig,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        let validation = ValidationService::new(store.clone(), catalogs.clone());
        Self { store, catalogs, validation, scanner_config, event_bus }
    }

    /// Runs the full pipeline over one ingestion root (`downloads/Films` or
    /// `downloads/Series`). Cross-item catalog lookups proceed one file at
    /// a time against the scanner's lazy stream (§5 ordering guarantee);
    /// parallelism across files is left to the caller running two of these
    /// concurrently, one per root.
    pub async fn run(
        &self,
        root: PathBuf,
        directory_hint: MediaTypeHint,
        events: mpsc::Sender<WorkflowEvent>,
        cancel: &CancellationToken,
    ) -> CoreResult<WorkflowReport> {
        let _ = events.send(WorkflowEvent::Started { root: root.clone() }).await;
        let _ = self.event_bus.send(NotificationEvent::ScanStarted { root: root.display().to_string() });
        let mut report = WorkflowReport::default();

        let mut stream = scanner::scan(root.clone(), directory_hint, self.scanner_config, cancel.clone());

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let next = tokio::select! {
                () = cancel.cancelled() => break,
                item = stream.next() => item,
            };
            let Some(scan_result) = next else { break };

            let scan_result = match scan_result {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "workflow: scan item failed, continuing");
                    continue;
                }
            };

            report.discovered += 1;
            let _ = events
                .send(WorkflowEvent::FileDiscovered { filename: scan_result.filename.clone() })
                .await;
            let _ = self
                .event_bus
                .send(NotificationEvent::ScanFileDiscovered { filename: scan_result.filename.clone() });

            match self.ingest_one(&scan_result, cancel).await {
                Ok(Outcome::AutoValidated(title)) => {
                    report.auto_validated += 1;
                    let _ = events
                        .send(WorkflowEvent::FileAutoValidated {
                            filename: scan_result.filename.clone(),
                            title: title.clone(),
                        })
                        .await;
                    let _ = self
                        .event_bus
                        .send(NotificationEvent::AutoValidated { filename: scan_result.filename.clone(), title });
                }
                Ok(Outcome::QueuedForReview) => {
                    report.queued_for_review += 1;
                    let _ = events
                        .send(WorkflowEvent::FileQueuedForReview { filename: scan_result.filename.clone() })
                        .await;
                    let _ = self
                        .event_bus
                        .send(NotificationEvent::QueuedForReview { filename: scan_result.filename.clone() });
                }
                Ok(Outcome::Skipped(reason)) => {
                    report.skipped += 1;
                    let _ = events
                        .send(WorkflowEvent::FileSkipped { filename: scan_result.filename.clone(), reason: reason.clone() })
                        .await;
                    let _ = self
                        .event_bus
                        .send(NotificationEvent::FileSkipped { filename: scan_result.filename.clone(), reason });
                }
                Err(CoreError::Cancelled) => break,
                Err(e) => {
                    report.skipped += 1;
                    warn!(filename = %scan_result.filename, error = %e, "workflow: ingest failed, skipping file");
                    let _ = events
                        .send(WorkflowEvent::FileSkipped {
                            filename: scan_result.filename.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                    let _ = self.event_bus.send(NotificationEvent::FileSkipped {
                        filename: scan_result.filename.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let _ = events.send(WorkflowEvent::RootFinished { root: root.clone() }).await;
        let _ = self
            .event_bus
            .send(NotificationEvent::ScanFinished { root: root.display().to_string(), discovered: report.discovered });
        info!(
            discovered = report.discovered,
            auto_validated = report.auto_validated,
            queued_for_review = report.queued_for_review,
            "workflow run finished"
        );
        Ok(report)
    }

    async fn ingest_one(&self, scan_result: &ScanResult, cancel: &CancellationToken) -> CoreResult<Outcome> {
        if self
            .store
            .get_video_file_by_path(&scan_result.path.to_string_lossy())
            .await?
            .is_some()
        {
            return Ok(Outcome::Skipped("already recorded".to_string()));
        }

        let file_hash = fs_port::hash_file(&scan_result.path).await.ok();
        let path_for_probe = scan_result.path.clone();
        let media_info = tokio::task::spawn_blocking(move || extract_media_info(&path_for_probe))
            .await
            .ok()
            .and_then(Result::ok);

        let video_file = self
            .store
            .record_scanned_file(
                &scan_result.path.to_string_lossy(),
                &scan_result.filename,
                scan_result.size_bytes as i64,
                file_hash.as_deref(),
                media_info.as_ref(),
                &scan_result.parsed,
                scan_result.corrected_location,
            )
            .await?;

        if matches!(scan_result.parsed.type_hint, MediaTypeHint::Unknown) {
            return Ok(Outcome::Skipped("unresolved type hint".to_string()));
        }

        let local_duration_seconds = media_info.as_ref().map(|info| info.duration_seconds);
        let candidates =
            matcher::match_candidates(&scan_result.parsed, local_duration_seconds, &self.catalogs, cancel).await?;
        if candidates.is_empty() {
            return Ok(Outcome::Skipped("no catalog matches".to_string()));
        }

        let series_group_key = matches!(scan_result.parsed.type_hint, MediaTypeHint::Series)
            .then(|| sort_key(&scan_result.parsed.title));

        let pending = self
            .store
            .create_pending_validation(video_file.id, &candidates, series_group_key.as_deref())
            .await?;

        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        if should_auto_validate(&scores) {
            let top = &candidates[0];
            let validated = self.validation.accept(pending.id, &top.external_id, cancel).await?;
            let _ = validated;
            return Ok(Outcome::AutoValidated(top.title.clone()));
        }

        Ok(Outcome::QueuedForReview)
    }
}

enum Outcome {
    AutoValidated(String),
    QueuedForReview,
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CatalogClient, EpisodeTitle, ExternalIds, MediaDetails};
    use crate::error::CoreResult as Result;
    use crate::models::CandidateSnapshot;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubTmdb {
        movie_id: &'static str,
    }

    #[async_trait]
    impl CatalogClient for StubTmdb {
        async fn search_movies(
            &self,
            _title: &str,
            _year: Option<i32>,
            _cancel: &CancellationToken,
        ) -> Result<Vec<CandidateSnapshot>> {
            Ok(vec![CandidateSnapshot {
                source: crate::models::CatalogSource::Tmdb,
                external_id: self.movie_id.to_string(),
                title: "The Matrix".to_string(),
                original_title: None,
                year: Some(1999),
                score: 0.0,
                poster_url: None,
                overview: None,
                cast_summary: None,
                duration_seconds: Some(8160.0),
                max_episode_count: None,
                vote_count: 12_000,
            }])
        }
        async fn get_movie_details(&self, external_id: &str, _cancel: &CancellationToken) -> Result<MediaDetails> {
            Ok(MediaDetails {
                external_id: external_id.to_string(),
                title: "The Matrix".to_string(),
                original_title: None,
                year: Some(1999),
                genres: vec!["Action".to_string()],
                overview: None,
                poster_url: None,
                director: None,
                cast: vec![],
                duration_seconds: Some(8160.0),
                max_episode_count: None,
            })
        }
        async fn find_by_external_id(&self, _id: &str, _cancel: &CancellationToken) -> Result<Option<MediaDetails>> {
            Ok(None)
        }
        async fn search_series(&self, _title: &str, _year: Option<i32>, _cancel: &CancellationToken) -> Result<Vec<CandidateSnapshot>> {
            Ok(Vec::new())
        }
        async fn get_series_details(&self, _id: &str, _cancel: &CancellationToken) -> Result<MediaDetails> {
            unimplemented!()
        }
        async fn get_series_external_ids(&self, _id: &str, _cancel: &CancellationToken) -> Result<ExternalIds> {
            unimplemented!()
        }
        async fn get_episode_titles(&self, _id: &str, _season: i32, _cancel: &CancellationToken) -> Result<Vec<EpisodeTitle>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn ingest_one_auto_validates_a_strong_single_match() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let catalogs = CatalogClients::new(Some(Arc::new(StubTmdb { movie_id: "603" })), None);
        let (event_bus, _) = broadcast::channel(16);
        let orchestrator = WorkflowOrchestrator::new(store.clone(), catalogs, ScannerConfig::default(), event_bus);

        let scan_result = ScanResult {
            path: PathBuf::from("/downloads/Films/The.Matrix.1999.mkv"),
            filename: "The.Matrix.1999.mkv".to_string(),
            size_bytes: 9_000_000_000,
            parsed: crate::models::ParsedFilename {
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
            },
            corrected_location: false,
        };

        let outcome = orchestrator.ingest_one(&scan_result, &CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, Outcome::AutoValidated(_)));

        let movie = store.find_movie_by_external_id(Some("603"), None).await.unwrap();
        assert!(movie.is_some());
    }
}
