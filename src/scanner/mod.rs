//! Scanner (§4.1, C2): walks a download root and yields one descriptor per
//! video file. The directory walk itself is blocking I/O, so it runs on a
//! dedicated thread and feeds results back over a channel — the same shape
//! the teacher uses for its library scan, generalized to a stream the
//! caller pulls lazily instead of a fire-and-forget background task.

use crate::error::CoreResult;
use crate::models::{MediaTypeHint, ParsedFilename};
use crate::parser::filename::{clean_title, parse_filename};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use walkdir::WalkDir;

pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "m4v", "webm", "wmv", "flv"];

const EXCLUDED_NAME_MARKERS: &[&str] = &["sample", "trailer", "extras", "bonus", "featurette"];

const DEFAULT_MIN_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ScannerConfig {
    pub min_file_size_bytes: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_file_size_bytes: DEFAULT_MIN_FILE_SIZE_BYTES,
        }
    }
}

/// One descriptor per video file found under a scanned root.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    pub parsed: ParsedFilename,
    /// True iff the parser's type contradicts the directory's intent
    /// (Movie found under a Series root or vice versa). `Unknown` never
    /// sets this flag.
    pub corrected_location: bool,
}

/// Pull-based handle over an in-progress directory walk. Each `next()` call
/// drives the walk forward by one item; dropping the stream mid-walk stops
/// the background thread from sending further results once its buffer
/// drains, and a scan can always be restarted by calling `scan` again since
/// it performs no mutation of the tree it reads.
pub struct ScanStream {
    rx: mpsc::Receiver<CoreResult<ScanResult>>,
}

impl ScanStream {
    pub async fn next(&mut self) -> Option<CoreResult<ScanResult>> {
        self.rx.recv().await
    }
}

/// Walks `root`, tagging every yielded file with `directory_hint` as the
/// intent to check the parser's own classification against.
pub fn scan(
    root: PathBuf,
    directory_hint: MediaTypeHint,
    config: ScannerConfig,
    cancel: CancellationToken,
) -> ScanStream {
    let (tx, rx) = mpsc::channel(64);

    tokio::task::spawn_blocking(move || {
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            if cancel.is_cancelled() {
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "scan: failed to read directory entry");
                    continue;
                }
            };

            if entry.path_is_symlink() || !entry.file_type().is_file() {
                continue;
            }

            let Some(result) = classify_entry(entry.path(), &root, directory_hint, config) else {
                continue;
            };

            if tx.blocking_send(Ok(result)).is_err() {
                break;
            }
        }
    });

    ScanStream { rx }
}

fn classify_entry(
    path: &Path,
    root: &Path,
    directory_hint: MediaTypeHint,
    config: ScannerConfig,
) -> Option<ScanResult> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)?;
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }

    let filename = path.file_name()?.to_str()?.to_string();

    let size_bytes = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "scan: failed to stat file, skipping");
            return None;
        }
    };

    if size_bytes < config.min_file_size_bytes {
        if matches_excluded_name_marker(&filename) {
            warn!(path = %path.display(), size_bytes, "scan: skipping undersized sample/trailer/extra");
        }
        return None;
    }

    let mut parsed = parse_filename(&filename);
    let corrected_location = parsed.type_hint != MediaTypeHint::Unknown
        && parsed.type_hint.contradicts(directory_hint);

    if matches!(parsed.type_hint, MediaTypeHint::Series) {
        if let Some(series_title) = rederive_series_title(path, root) {
            parsed.title = series_title;
        }
    }

    Some(ScanResult {
        path: path.to_path_buf(),
        filename,
        size_bytes,
        parsed,
        corrected_location,
    })
}

fn matches_excluded_name_marker(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    EXCLUDED_NAME_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn season_dir_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(season\s*\d{1,2}|s\d{1,2})$").expect("valid regex"))
}

fn trailing_year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(?(19\d{2}|20\d{2})\)?\s*$").expect("valid regex"))
}

/// Climbs from the file's directory toward `root`, skipping season-shaped
/// directory names, and returns the first ancestor name that looks like a
/// series title rather than an episode title. Reduces false positives in
/// the association checker (§4.7), where an episode-title-as-series-title
/// would otherwise drift from the catalog on every comparison.
fn rederive_series_title(file_path: &Path, root: &Path) -> Option<String> {
    let mut current = file_path.parent();
    while let Some(dir) = current {
        if dir == root {
            return None;
        }
        let name = dir.file_name()?.to_str()?;
        if !season_dir_regex().is_match(name) {
            let cleaned = clean_title(&trailing_year_regex().replace(name, ""));
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0_u8; bytes]).unwrap();
    }

    #[tokio::test]
    async fn skips_undersized_files() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("Movie.2020.mkv"), 1024);

        let mut stream = scan(
            dir.path().to_path_buf(),
            MediaTypeHint::Movie,
            ScannerConfig::default(),
            CancellationToken::new(),
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn flags_corrected_location_for_contradicting_type() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("Lost.S01E01.mkv"), 200 * 1024 * 1024);

        let mut stream = scan(
            dir.path().to_path_buf(),
            MediaTypeHint::Movie,
            ScannerConfig::default(),
            CancellationToken::new(),
        );
        let result = stream.next().await.unwrap().unwrap();
        assert!(result.corrected_location);
        assert_eq!(result.parsed.type_hint, MediaTypeHint::Series);
    }

    #[tokio::test]
    async fn unknown_type_never_flags_correction() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("random_home_video.mkv"), 200 * 1024 * 1024);

        let mut stream = scan(
            dir.path().to_path_buf(),
            MediaTypeHint::Movie,
            ScannerConfig::default(),
            CancellationToken::new(),
        );
        let result = stream.next().await.unwrap().unwrap();
        assert!(!result.corrected_location);
    }

    #[tokio::test]
    async fn rederives_series_title_from_parent_directory() {
        let dir = tempdir().unwrap();
        write_file(
            &dir.path().join("Lost (2004)/Season 01/S01E01.Pilot.mkv"),
            200 * 1024 * 1024,
        );

        let mut stream = scan(
            dir.path().to_path_buf(),
            MediaTypeHint::Series,
            ScannerConfig::default(),
            CancellationToken::new(),
        );
        let result = stream.next().await.unwrap().unwrap();
        assert_eq!(result.parsed.title, "Lost");
    }

    #[tokio::test]
    async fn skips_symlinked_files() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real.mkv");
        write_file(&real, 200 * 1024 * 1024);
        let link = dir.path().join("link.mkv");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut stream = scan(
            dir.path().to_path_buf(),
            MediaTypeHint::Movie,
            ScannerConfig::default(),
            CancellationToken::new(),
        );
        let mut seen = Vec::new();
        while let Some(Ok(result)) = stream.next().await {
            seen.push(result.filename);
        }
        assert_eq!(seen, vec!["real.mkv".to_string()]);
    }
}
