//! Transferer (§4.5, C7): pre-flight conflict detection, then move +
//! symlink for every Validated item. Conflicts suspend the batch on a
//! one-shot reply channel (§9) rather than guessing at a resolution.

use crate::db::Store;
use crate::domain::NotificationEvent;
use crate::entities::{episodes, movies, pending_validations, series, video_files};
use crate::error::{ConflictKind, CoreError, CoreResult};
use crate::fs_port;
use crate::models::{CatalogSource, MediaTypeHint, ParsedFilename};
use sea_orm::Set;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    KeepOld,
    KeepNew,
    KeepBoth,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ConflictContext {
    pub pending_id: i32,
    pub kind: ConflictKind,
    pub destination: PathBuf,
}

pub enum TransferEvent {
    Started { total: usize },
    Progress { done: usize, total: usize, current_filename: String },
    Conflict { context: ConflictContext, reply: oneshot::Sender<ConflictChoice> },
    Resolved { pending_id: i32, choice: ConflictChoice },
    Finished { report: TransferReport },
}

#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    pub transferred: usize,
    pub duplicates_skipped: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum TransferOutcome {
    Transferred,
    Duplicate,
    Skipped,
}

enum MaterializedTarget {
    Movie(movies::Model),
    Episode(episodes::Model),
}

pub struct TransferService {
    store: Store,
    storage_dir: PathBuf,
    video_dir: PathBuf,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl TransferService {
    #[must_use]
    pub fn new(
        store: Store,
        storage_dir: PathBuf,
        video_dir: PathBuf,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self { store, storage_dir, video_dir, event_bus }
    }

    /// Runs the batch over every Validated item. `dry_run` performs every
    /// check and emits every event but never touches the filesystem.
    pub async fn execute(
        &self,
        dry_run: bool,
        events: mpsc::Sender<TransferEvent>,
        cancel: &CancellationToken,
    ) -> CoreResult<TransferReport> {
        let validated = self.store.list_validated().await?;
        let total = validated.len();
        let _ = events.send(TransferEvent::Started { total }).await;
        let _ = self.event_bus.send(NotificationEvent::TransferStarted { total });

        let mut report = TransferReport::default();

        for (done, pending) in validated.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            let Some(video_file) = self.store.get_video_file(pending.video_file_id).await? else {
                warn!(pending_id = pending.id, "transfer: underlying video_file missing, skipping");
                report.failed += 1;
                continue;
            };

            let _ = events
                .send(TransferEvent::Progress {
                    done,
                    total,
                    current_filename: video_file.filename.clone(),
                })
                .await;
            let _ = self.event_bus.send(NotificationEvent::TransferProgress {
                done,
                total,
                current_filename: video_file.filename.clone(),
            });

            match self.transfer_one(&pending, &video_file, dry_run, &events, cancel).await {
                Ok(TransferOutcome::Transferred) => report.transferred += 1,
                Ok(TransferOutcome::Duplicate) => report.duplicates_skipped += 1,
                Ok(TransferOutcome::Skipped) => report.skipped += 1,
                Err(CoreError::Cancelled) => break,
                Err(e) => {
                    warn!(pending_id = pending.id, error = %e, "transfer: item failed, left validated");
                    report.failed += 1;
                }
            }
        }

        let _ = events
            .send(TransferEvent::Progress {
                done: total,
                total,
                current_filename: String::new(),
            })
            .await;
        let _ = events.send(TransferEvent::Finished { report: report.clone() }).await;
        let _ = self.event_bus.send(NotificationEvent::TransferFinished {
            transferred: report.transferred,
            skipped: report.skipped,
            failed: report.failed,
        });
        Ok(report)
    }

    async fn transfer_one(
        &self,
        pending: &pending_validations::Model,
        video_file: &video_files::Model,
        dry_run: bool,
        events: &mpsc::Sender<TransferEvent>,
        cancel: &CancellationToken,
    ) -> CoreResult<TransferOutcome> {
        let parsed: ParsedFilename =
            serde_json::from_str(&video_file.parsed).map_err(|e| CoreError::StoreConsistency(e.to_string()))?;
        let extension = Path::new(&video_file.filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mkv")
            .to_string();
        let selected_id = pending
            .selected_candidate_id
            .as_deref()
            .ok_or_else(|| CoreError::StoreConsistency(format!("pending_validation {} has no selection", pending.id)))?;
        let selected_source = Store::decode_candidates(pending)
            .into_iter()
            .find(|c| c.external_id == selected_id)
            .map(|c| c.source)
            .ok_or_else(|| {
                CoreError::StoreConsistency(format!(
                    "selected candidate {selected_id} not present in pending_validation {} snapshots",
                    pending.id
                ))
            })?;
        let (tmdb_id, tvdb_id, imdb_id) = match selected_source {
            CatalogSource::Tmdb => (Some(selected_id), None, None),
            CatalogSource::Tvdb => (None, Some(selected_id), None),
            CatalogSource::Imdb => (None, None, Some(selected_id)),
        };

        let (destination, existing_entity_path, target) = match parsed.type_hint {
            MediaTypeHint::Movie => {
                let movie = self
                    .store
                    .find_movie_by_external_id(tmdb_id, imdb_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::StoreConsistency(format!("movie not materialized for pending_validation {}", pending.id))
                    })?;
                let destination = self.movie_destination(&movie, &extension);
                let existing = movie.file_path.clone();
                (destination, existing, MaterializedTarget::Movie(movie))
            }
            MediaTypeHint::Series => {
                let series_model = self
                    .store
                    .find_series_by_external_id(tmdb_id, tvdb_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::StoreConsistency(format!("series not materialized for pending_validation {}", pending.id))
                    })?;
                let season = parsed.season.unwrap_or(1);
                let episode_number = parsed
                    .episode
                    .ok_or_else(|| CoreError::StoreConsistency("series item has no parsed episode number".to_string()))?;
                let episode = self
                    .store
                    .get_episode_by_natural_key(series_model.id, season, episode_number)
                    .await?
                    .ok_or_else(|| {
                        CoreError::StoreConsistency(format!("episode not materialized for pending_validation {}", pending.id))
                    })?;
                let destination = self.episode_destination(&series_model, &episode, &extension);
                let existing = episode.file_path.clone();
                (destination, existing, MaterializedTarget::Episode(episode))
            }
            MediaTypeHint::Unknown => {
                return Err(CoreError::StoreConsistency(
                    "validated item has an unresolved type hint".to_string(),
                ));
            }
        };

        let source_hash = match &video_file.file_hash {
            Some(hash) => Some(hash.clone()),
            None => {
                let computed = fs_port::hash_file(Path::new(&video_file.path)).await.ok();
                if let Some(ref hash) = computed {
                    let _ = self.store.backfill_video_file_hash(video_file.id, hash).await;
                }
                computed
            }
        };

        let conflict = self
            .detect_conflict(existing_entity_path.as_deref(), &destination, source_hash.as_deref())
            .await?;

        let final_destination = match conflict {
            None => destination,
            Some(ConflictKind::Duplicate { .. }) => return Ok(TransferOutcome::Duplicate),
            Some(kind @ (ConflictKind::NameCollision { .. } | ConflictKind::SimilarContent { .. })) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let context = ConflictContext {
                    pending_id: pending.id,
                    kind,
                    destination: destination.clone(),
                };
                let _ = self.event_bus.send(NotificationEvent::TransferConflict {
                    pending_id: pending.id,
                    destination: context.destination.to_string_lossy().into_owned(),
                });
                if events.send(TransferEvent::Conflict { context, reply: reply_tx }).await.is_err() {
                    return Ok(TransferOutcome::Skipped);
                }

                let choice = tokio::select! {
                    () = cancel.cancelled() => return Err(CoreError::Cancelled),
                    result = reply_rx => result.map_err(|_| CoreError::Cancelled)?,
                };
                let _ = events
                    .send(TransferEvent::Resolved { pending_id: pending.id, choice })
                    .await;
                let _ = self.event_bus.send(NotificationEvent::TransferResolved {
                    pending_id: pending.id,
                    choice: format!("{choice:?}"),
                });

                match choice {
                    ConflictChoice::Skip | ConflictChoice::KeepOld => return Ok(TransferOutcome::Skipped),
                    ConflictChoice::KeepNew => destination,
                    ConflictChoice::KeepBoth => Self::alt_destination(&destination),
                }
            }
        };

        if dry_run {
            return Ok(TransferOutcome::Transferred);
        }

        let symlink_path = self.presentation_path(&final_destination);
        fs_port::scoped_transfer(Path::new(&video_file.path), &final_destination, &symlink_path).await?;

        match target {
            MaterializedTarget::Movie(movie) => {
                let mut am: movies::ActiveModel = movie.into();
                am.file_path = Set(Some(final_destination.to_string_lossy().into_owned()));
                am.updated_at = Set(chrono::Utc::now().to_rfc3339());
                self.store.save_movie(am).await?;
            }
            MaterializedTarget::Episode(episode) => {
                self.store
                    .update_episode_path(episode.id, &final_destination.to_string_lossy())
                    .await?;
            }
        }

        Ok(TransferOutcome::Transferred)
    }

    /// `existing_entity_path` is the entity's own `file_path` from a prior
    /// transfer, distinct from "something happens to occupy `destination`".
    /// A hash match against the entity's own prior file is a Duplicate; a
    /// hash mismatch there is a re-encode (SimilarContent). A collision
    /// against an unrelated occupant of `destination` is always
    /// NameCollision unless the hashes happen to match (Duplicate). Missing
    /// hashes never claim Duplicate (§9 open question).
    async fn detect_conflict(
        &self,
        existing_entity_path: Option<&str>,
        destination: &Path,
        source_hash: Option<&str>,
    ) -> CoreResult<Option<ConflictKind>> {
        if let Some(existing) = existing_entity_path {
            if Path::new(existing) == destination {
                let existing_path = existing.to_string();
                if let Some(src) = source_hash {
                    if let Ok(dst_hash) = fs_port::hash_file(destination).await {
                        if dst_hash == src {
                            return Ok(Some(ConflictKind::Duplicate { existing_path }));
                        }
                    }
                }
                return Ok(Some(ConflictKind::SimilarContent { existing_path }));
            }
        }

        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            let existing_path = destination.to_string_lossy().into_owned();
            let Some(source_hash) = source_hash else {
                return Ok(Some(ConflictKind::NameCollision { existing_path }));
            };
            return match fs_port::hash_file(destination).await {
                Ok(existing_hash) if existing_hash == source_hash => Ok(Some(ConflictKind::Duplicate { existing_path })),
                _ => Ok(Some(ConflictKind::NameCollision { existing_path })),
            };
        }

        Ok(None)
    }

    fn movie_destination(&self, movie: &movies::Model, extension: &str) -> PathBuf {
        let genre = first_genre(&movie.genres);
        let letter = letter_bucket(&movie.title).to_string();
        let display = display_title(&movie.title, movie.year);
        self.storage_dir
            .join("Films")
            .join(fs_port::sanitize_path_component(&genre))
            .join(fs_port::sanitize_path_component(&letter))
            .join(fs_port::sanitize_path_component(&display))
            .join(format!("{}.{extension}", fs_port::sanitize_path_component(&display)))
    }

    fn episode_destination(&self, series_model: &series::Model, episode: &episodes::Model, extension: &str) -> PathBuf {
        let letter = letter_bucket(&series_model.title).to_string();
        let display = display_title(&series_model.title, series_model.year);
        let season_dir = format!("Season {:02}", episode.season_number);
        let episode_label = format!(
            "{display} - S{:02}E{:02}{}",
            episode.season_number,
            episode.episode_number,
            episode.title.as_deref().map(|t| format!(" - {t}")).unwrap_or_default(),
        );
        self.storage_dir
            .join("Series")
            .join(fs_port::sanitize_path_component(&letter))
            .join(fs_port::sanitize_path_component(&display))
            .join(season_dir)
            .join(format!("{}.{extension}", fs_port::sanitize_path_component(&episode_label)))
    }

    fn presentation_path(&self, storage_path: &Path) -> PathBuf {
        match storage_path.strip_prefix(&self.storage_dir) {
            Ok(relative) => self.video_dir.join(relative),
            Err(_) => self.video_dir.join(storage_path.file_name().unwrap_or_default()),
        }
    }

    fn alt_destination(destination: &Path) -> PathBuf {
        let stem = destination.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
        let ext = destination.extension().and_then(|s| s.to_str());
        let parent = destination.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut n = 1_u32;
        loop {
            let suffix = if n == 1 { "-alt".to_string() } else { format!("-alt{n}") };
            let name = ext.map_or_else(|| format!("{stem}{suffix}"), |ext| format!("{stem}{suffix}.{ext}"));
            let candidate = parent.join(name);
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

fn first_genre(genres_json: &str) -> String {
    serde_json::from_str::<Vec<String>>(genres_json)
        .ok()
        .and_then(|g| g.into_iter().next())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn letter_bucket(title: &str) -> char {
    title
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('#')
}

fn display_title(title: &str, year: Option<i32>) -> String {
    year.map_or_else(|| title.to_string(), |y| format!("{title} ({y})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_bucket_falls_back_to_hash_for_symbols() {
        assert_eq!(letter_bucket("Se7en"), 'S');
        assert_eq!(letter_bucket("...And Justice for All"), 'A');
        assert_eq!(letter_bucket("###"), '#');
    }

    #[test]
    fn display_title_appends_year_when_present() {
        assert_eq!(display_title("The Matrix", Some(1999)), "The Matrix (1999)");
        assert_eq!(display_title("The Matrix", None), "The Matrix");
    }

    #[test]
    fn first_genre_defaults_to_unknown() {
        assert_eq!(first_genre("[]"), "Unknown");
        assert_eq!(first_genre(r#"["Action","Sci-Fi"]"#), "Action");
    }

    #[test]
    fn alt_destination_increments_suffix_until_free() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("Movie (2020).mkv");
        std::fs::write(&base, b"x").unwrap();
        let first_alt = TransferService::alt_destination(&base);
        assert_eq!(first_alt.file_name().unwrap().to_str().unwrap(), "Movie (2020)-alt.mkv");
        std::fs::write(&first_alt, b"x").unwrap();
        let second_alt = TransferService::alt_destination(&base);
        assert_eq!(second_alt.file_name().unwrap().to_str().unwrap(), "Movie (2020)-alt2.mkv");
    }
}
