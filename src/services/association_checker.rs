//! Association Checker (§4.7, C8): a heuristic audit over already-validated
//! Movies/Episodes, flagging entries whose on-disk file looks like it no
//! longer matches the catalog entity pointing at it. Runs on demand, not
//! continuously — the 24h scan cache exists so repeated runs within a day
//! skip the ffprobe pass for files that have not changed.

use crate::db::Store;
use crate::domain::NotificationEvent;
use crate::entities::{episodes, movies};
use crate::error::CoreResult;
use crate::matcher::normalize::token_set_ratio;
use crate::models::MediaInfo;
use crate::parser::filename::parse_filename;
use crate::parser::media::extract_media_info;
use crate::services::quality_scan_cache::QualityScanCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const TITLE_DRIFT_THRESHOLD: f64 = 75.0;
const YEAR_DRIFT_THRESHOLD: i32 = 2;
const DURATION_DRIFT_FRACTION: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Movie,
    Episode,
}

impl EntityKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Episode => "Episode",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuspiciousAssociation {
    pub entity_type: EntityKind,
    pub entity_id: i32,
    pub file_path: PathBuf,
    pub confidence: i32,
    pub reasons: Vec<String>,
}

pub struct AssociationChecker {
    store: Store,
    event_bus: broadcast::Sender<NotificationEvent>,
    scan_cache: Arc<QualityScanCache>,
}

impl AssociationChecker {
    #[must_use]
    pub const fn new(
        store: Store,
        event_bus: broadcast::Sender<NotificationEvent>,
        scan_cache: Arc<QualityScanCache>,
    ) -> Self {
        Self { store, event_bus, scan_cache }
    }

    /// Scans every Movie and Episode with a resolved `file_path`, skipping
    /// items excluded by a `ConfirmedAssociation` or a fresh cache hit.
    pub async fn scan_suspicious(&self, cancel: &CancellationToken) -> CoreResult<Vec<SuspiciousAssociation>> {
        let _ = self.event_bus.send(NotificationEvent::AssociationScanStarted);
        let mut flagged = Vec::new();

        for movie in self.store.list_all_movies().await? {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(result) = self.check_movie(&movie).await? {
                flagged.push(result);
            }
        }

        for series_model in self.store.list_all_series().await? {
            if cancel.is_cancelled() {
                break;
            }
            for episode in self.store.list_episodes_for_series(series_model.id).await? {
                if cancel.is_cancelled() {
                    break;
                }
                if let Some(result) = self.check_episode(&series_model, &episode).await? {
                    flagged.push(result);
                }
            }
        }

        let _ = self
            .event_bus
            .send(NotificationEvent::AssociationScanFinished { flagged: flagged.len() });
        Ok(flagged)
    }

    async fn check_movie(&self, movie: &movies::Model) -> CoreResult<Option<SuspiciousAssociation>> {
        let Some(file_path) = movie.file_path.as_deref() else {
            return Ok(None);
        };
        if self.store.is_association_confirmed("Movie", movie.id).await? {
            return Ok(None);
        }

        let fingerprint = fingerprint("Movie", movie.id, file_path);
        if let Some(cached) = self.scan_cache.get_fresh(&fingerprint).await? {
            return Ok((cached.confidence < 100).then(|| SuspiciousAssociation {
                entity_type: EntityKind::Movie,
                entity_id: movie.id,
                file_path: PathBuf::from(file_path),
                confidence: cached.confidence,
                reasons: cached.reason.into_iter().collect(),
            }));
        }

        let mut reasons = Vec::new();
        let mut confidence = 100_i32;

        let parsed_title = filename_title(file_path);
        if let Some(drift) = title_drift(&parsed_title, &movie.title, movie.original_title.as_deref()) {
            reasons.push(drift);
            confidence -= 30;
        }

        if let Some(parsed_year) = parse_filename(&filename_of(file_path)).year {
            if let Some(entity_year) = movie.year {
                if (parsed_year - entity_year).abs() >= YEAR_DRIFT_THRESHOLD {
                    reasons.push(format!("year drift: file suggests {parsed_year}, catalog has {entity_year}"));
                    confidence -= 20;
                }
            }
        }

        match extract_local_media_info(Path::new(file_path)).await {
            Ok(Some(info)) => {
                if let Some(entity_duration) = movie.duration_seconds {
                    if entity_duration > 0.0 {
                        let fraction = (info.duration_seconds - entity_duration).abs() / entity_duration;
                        if fraction > DURATION_DRIFT_FRACTION {
                            reasons.push(format!(
                                "duration drift: file is {:.0}s, catalog expects {:.0}s",
                                info.duration_seconds, entity_duration
                            ));
                            confidence -= 25;
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(movie_id = movie.id, error = %e, "association check: could not read local media info"),
        }

        confidence = confidence.max(0);
        let reason = (!reasons.is_empty()).then(|| reasons.join("; "));
        self.scan_cache
            .put(&fingerprint, "Movie", movie.id, confidence, reason.as_deref())
            .await?;

        if reasons.is_empty() {
            return Ok(None);
        }
        Ok(Some(SuspiciousAssociation {
            entity_type: EntityKind::Movie,
            entity_id: movie.id,
            file_path: PathBuf::from(file_path),
            confidence,
            reasons,
        }))
    }

    async fn check_episode(
        &self,
        series_model: &crate::entities::series::Model,
        episode: &episodes::Model,
    ) -> CoreResult<Option<SuspiciousAssociation>> {
        let Some(file_path) = episode.file_path.as_deref() else {
            return Ok(None);
        };
        if self.store.is_association_confirmed("Episode", episode.id).await? {
            return Ok(None);
        }

        let fingerprint = fingerprint("Episode", episode.id, file_path);
        if let Some(cached) = self.scan_cache.get_fresh(&fingerprint).await? {
            return Ok((cached.confidence < 100).then(|| SuspiciousAssociation {
                entity_type: EntityKind::Episode,
                entity_id: episode.id,
                file_path: PathBuf::from(file_path),
                confidence: cached.confidence,
                reasons: cached.reason.into_iter().collect(),
            }));
        }

        let mut reasons = Vec::new();
        let mut confidence = 100_i32;

        let parsed_from_filename = parse_filename(&filename_of(file_path));

        if let Some(drift) =
            title_drift(&parsed_from_filename.title, &series_model.title, series_model.original_title.as_deref())
        {
            reasons.push(drift);
            confidence -= 30;
        }

        if let Some(parsed_year) = parsed_from_filename.year {
            if let Some(entity_year) = series_model.year {
                if (parsed_year - entity_year).abs() >= YEAR_DRIFT_THRESHOLD {
                    reasons.push(format!("year drift: file suggests {parsed_year}, catalog has {entity_year}"));
                    confidence -= 20;
                }
            }
        }

        if let (Some(season), Some(episode_number)) = (parsed_from_filename.season, parsed_from_filename.episode) {
            if season != episode.season_number || episode_number != episode.episode_number {
                reasons.push(format!(
                    "episode number drift: filename suggests S{season:02}E{episode_number:02}, catalog has S{:02}E{:02}",
                    episode.season_number, episode.episode_number
                ));
                confidence -= 25;
            }
        }

        confidence = confidence.max(0);
        let reason = (!reasons.is_empty()).then(|| reasons.join("; "));
        self.scan_cache
            .put(&fingerprint, "Episode", episode.id, confidence, reason.as_deref())
            .await?;

        if reasons.is_empty() {
            return Ok(None);
        }
        Ok(Some(SuspiciousAssociation {
            entity_type: EntityKind::Episode,
            entity_id: episode.id,
            file_path: PathBuf::from(file_path),
            confidence,
            reasons,
        }))
    }

    pub async fn confirm(&self, entity: EntityKind, entity_id: i32) -> CoreResult<()> {
        self.store.confirm_association(entity.as_str(), entity_id).await?;
        self.scan_cache.invalidate_entity(entity.as_str(), entity_id).await
    }
}

fn filename_of(path: &str) -> String {
    Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path).to_string()
}

fn filename_title(path: &str) -> String {
    parse_filename(&filename_of(path)).title
}

fn title_drift(parsed_title: &str, title: &str, original_title: Option<&str>) -> Option<String> {
    let against_title = token_set_ratio(parsed_title, title);
    let against_original = original_title.map(|o| token_set_ratio(parsed_title, o)).unwrap_or(0.0);
    let best = against_title.max(against_original);
    (best < TITLE_DRIFT_THRESHOLD).then(|| format!("title drift: filename suggests \"{parsed_title}\" ({best:.0} match)"))
}

async fn extract_local_media_info(path: &Path) -> CoreResult<Option<MediaInfo>> {
    let path = path.to_path_buf();
    if tokio::fs::metadata(&path).await.is_err() {
        return Ok(None);
    }
    let info = tokio::task::spawn_blocking(move || extract_media_info(&path))
        .await
        .map_err(|e| crate::error::CoreError::FilesystemIo(e.to_string()))??;
    Ok(Some(info))
}

fn fingerprint(entity_type: &str, entity_id: i32, file_path: &str) -> String {
    format!(
        "{entity_type}:{entity_id}:{:016x}",
        xxhash_rust::xxh3::xxh3_64(file_path.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_drift_accepts_reordered_tokens() {
        assert!(title_drift("Matrix The", "The Matrix", None).is_none());
    }

    #[test]
    fn title_drift_flags_unrelated_titles() {
        assert!(title_drift("Completely Different Movie", "The Matrix", None).is_some());
    }

    #[test]
    fn title_drift_checks_original_title_too() {
        assert!(title_drift("Le Fabuleux Destin d Amelie Poulain", "Amelie", Some("Le Fabuleux Destin d'Amelie Poulain")).is_none());
    }

    #[test]
    fn fingerprint_changes_with_path() {
        let a = fingerprint("Movie", 1, "/video/a.mkv");
        let b = fingerprint("Movie", 1, "/video/b.mkv");
        assert_ne!(a, b);
    }
}
