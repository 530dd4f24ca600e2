//! File System Port (§4.1/§9, C1): enumerates video files, creates and
//! repairs the presentation-tree symlinks, and performs the scoped
//! move-then-symlink-then-rename sequence that keeps a partial transfer
//! from ever leaving a dangling link. Grounded on the teacher's
//! `library::LibraryService::import_file` move/copy/hardlink fallback,
//! generalized to the symlink-backed storage/presentation split this
//! system uses instead of a single library tree.

use crate::error::{CoreError, CoreResult};
use crate::scanner::VIDEO_EXTENSIONS;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Forbidden filename characters (§4.5) replaced deterministically.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Enumerates regular, non-symlink video files under `root` (used by
/// integrity checks and the transferer's duplicate scan, independent of
/// the scanner's parse-and-classify pipeline).
pub fn enumerate_video_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.path_is_symlink() && e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Replaces characters forbidden in filenames (§4.5). Colons become
/// " -"; everything else in the forbidden set becomes a space, then
/// runs of whitespace collapse to one.
#[must_use]
pub fn sanitize_path_component(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == ':' {
            result.push_str(" -");
        } else if FORBIDDEN_CHARS.contains(&c) {
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Moves `source` to `destination`, renaming when both are on the same
/// filesystem and falling back to copy-then-delete (with a byte-size
/// verification) across filesystem boundaries.
pub async fn move_file(source: &Path, destination: &Path) -> CoreResult<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => copy_then_delete(source, destination).await,
        Err(e) => Err(CoreError::from(e)),
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    matches!(e.raw_os_error(), Some(18)) // EXDEV
}

async fn copy_then_delete(source: &Path, destination: &Path) -> CoreResult<()> {
    let source_size = tokio::fs::metadata(source).await?.len();
    tokio::fs::copy(source, destination).await?;
    let dest_size = tokio::fs::metadata(destination).await?.len();

    if source_size != dest_size {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(CoreError::FilesystemIo(format!(
            "copy verification failed: {} bytes vs {} bytes",
            source_size, dest_size
        )));
    }

    tokio::fs::remove_file(source).await?;
    Ok(())
}

/// Creates a symlink at `link` pointing at `target`, replacing any
/// existing entry at `link` first.
pub async fn create_symlink(target: &Path, link: &Path) -> CoreResult<()> {
    if let Some(parent) = link.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::symlink_metadata(link).await.is_ok() {
        tokio::fs::remove_file(link).await?;
    }

    #[cfg(unix)]
    tokio::fs::symlink(target, link).await?;
    #[cfg(not(unix))]
    tokio::fs::copy(target, link).await.map(|_| ())?;

    Ok(())
}

/// Size of each of the three sampled windows (head/middle/tail) hashed by
/// `hash_file`, in bytes.
const SAMPLE_WINDOW_BYTES: u64 = 1024 * 1024;

/// Hashes `path` through xxh3 on a blocking thread over a fixed sample
/// (file size, plus head/middle/tail windows for files larger than the
/// sample window) and returns the digest as lowercase hex. Used for
/// duplicate detection (§4.5); sampling rather than streaming the full
/// file keeps large video files cheap to fingerprint while still being
/// deterministic across invocations for identical bytes (§3 invariant 6).
pub async fn hash_file(path: &Path) -> CoreResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> CoreResult<String> {
        use std::io::{Read, Seek, SeekFrom};

        let mut file = std::fs::File::open(&path)?;
        let size = file.metadata()?.len();

        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        hasher.update(&size.to_le_bytes());

        let window = SAMPLE_WINDOW_BYTES.min(size);
        let mut buf = vec![0_u8; window as usize];

        let mut hash_window = |hasher: &mut xxhash_rust::xxh3::Xxh3, offset: u64| -> CoreResult<()> {
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf[..window as usize])?;
            hasher.update(&buf[..window as usize]);
            Ok(())
        };

        if window == 0 {
            return Ok(format!("{:016x}", hasher.digest()));
        }

        hash_window(&mut hasher, 0)?;

        if size > window {
            let middle_offset = (size - window) / 2;
            if middle_offset > 0 {
                hash_window(&mut hasher, middle_offset)?;
            }
            let tail_offset = size - window;
            if tail_offset > middle_offset {
                hash_window(&mut hasher, tail_offset)?;
            }
        }

        Ok(format!("{:016x}", hasher.digest()))
    })
    .await
    .map_err(|e| CoreError::FilesystemIo(e.to_string()))?
}

/// Re-links `link` to `target` if it is currently broken or pointing
/// elsewhere; no-op if it already resolves correctly.
pub async fn repair_symlink(link: &Path, target: &Path) -> CoreResult<()> {
    match tokio::fs::read_link(link).await {
        Ok(current) if current == target => Ok(()),
        _ => create_symlink(target, link).await,
    }
}

/// Moves a dead symlink aside into `trash_dir/orphans/<timestamp>-<name>`
/// rather than deleting it outright (§6).
pub async fn park_orphan_symlink(link: &Path, trash_dir: &Path) -> CoreResult<PathBuf> {
    let orphans_dir = trash_dir.join("orphans");
    tokio::fs::create_dir_all(&orphans_dir).await?;

    let name = link
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::InvalidInput(format!("invalid symlink path: {}", link.display())))?;
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let parked = orphans_dir.join(format!("{timestamp}-{name}"));

    tokio::fs::rename(link, &parked).await?;
    warn!(from = %link.display(), to = %parked.display(), "parked dead symlink in trash/orphans");
    Ok(parked)
}

/// Scoped move-then-symlink-then-rename (§9): moves `source` into a
/// temporary name adjacent to `final_path`, points `symlink_path` at the
/// temporary, then atomically renames the temporary to `final_path`. Any
/// failure unwinds what has already happened so a crash never leaves a
/// dangling link or a half-moved file.
pub async fn scoped_transfer(
    source: &Path,
    final_path: &Path,
    symlink_path: &Path,
) -> CoreResult<()> {
    let parent = final_path.parent().ok_or_else(|| {
        CoreError::InvalidInput(format!("destination has no parent: {}", final_path.display()))
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let temp_name = format!(
        ".{}.tmp-{}",
        final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("transfer"),
        uuid::Uuid::new_v4()
    );
    let temp_path = parent.join(temp_name);

    move_file(source, &temp_path).await?;

    if let Err(e) = create_symlink(&temp_path, symlink_path).await {
        unwind_move(&temp_path, source).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, final_path).await {
        let _ = tokio::fs::remove_file(symlink_path).await;
        unwind_move(&temp_path, source).await;
        return Err(CoreError::from(e));
    }

    if let Err(e) = repair_symlink(symlink_path, final_path).await {
        warn!(error = %e, "scoped_transfer: repointing symlink to final name failed");
    }

    info!(destination = %final_path.display(), "scoped transfer complete");
    Ok(())
}

async fn unwind_move(temp_path: &Path, original_source: &Path) {
    if tokio::fs::metadata(temp_path).await.is_ok()
        && let Err(e) = tokio::fs::rename(temp_path, original_source).await
    {
        warn!(
            temp = %temp_path.display(),
            source = %original_source.display(),
            error = %e,
            "scoped_transfer: failed to unwind partially completed move"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitize_replaces_colon_with_dash() {
        assert_eq!(sanitize_path_component("Title: Subtitle"), "Title - Subtitle");
    }

    #[test]
    fn sanitize_collapses_forbidden_chars() {
        assert_eq!(sanitize_path_component("A/B\\C*D"), "A B C D");
    }

    #[tokio::test]
    async fn move_file_renames_within_same_filesystem() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mkv");
        let destination = dir.path().join("nested/destination.mkv");
        tokio::fs::write(&source, b"data").await.unwrap();

        move_file(&source, &destination).await.unwrap();

        assert!(!source.exists());
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn scoped_transfer_leaves_symlink_resolving_to_final_path() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mkv");
        tokio::fs::write(&source, b"payload").await.unwrap();

        let final_path = dir.path().join("storage/Movie (2020)/Movie (2020).mkv");
        let symlink_path = dir.path().join("video/Movie (2020).mkv");

        scoped_transfer(&source, &final_path, &symlink_path).await.unwrap();

        assert!(final_path.exists());
        assert!(!source.exists());
        let resolved = tokio::fs::canonicalize(&symlink_path).await.unwrap();
        assert_eq!(resolved, tokio::fs::canonicalize(&final_path).await.unwrap());
    }

    #[tokio::test]
    async fn repair_symlink_is_noop_when_already_correct() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.mkv");
        tokio::fs::write(&target, b"x").await.unwrap();
        let link = dir.path().join("link.mkv");
        create_symlink(&target, &link).await.unwrap();

        repair_symlink(&link, &target).await.unwrap();
        assert_eq!(tokio::fs::read_link(&link).await.unwrap(), target);
    }

    #[tokio::test]
    async fn hash_file_is_deterministic_for_identical_bytes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.mkv");
        let b = dir.path().join("b.mkv");
        tokio::fs::write(&a, b"same content").await.unwrap();
        tokio::fs::write(&b, b"same content").await.unwrap();

        assert_eq!(hash_file(&a).await.unwrap(), hash_file(&b).await.unwrap());
    }

    #[tokio::test]
    async fn park_orphan_symlink_moves_into_trash_orphans() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("gone.mkv");
        let link = dir.path().join("video/broken.mkv");
        tokio::fs::create_dir_all(link.parent().unwrap()).await.unwrap();
        #[cfg(unix)]
        tokio::fs::symlink(&target, &link).await.unwrap();

        let trash_dir = dir.path().join("trash");
        let parked = park_orphan_symlink(&link, &trash_dir).await.unwrap();

        assert!(!link.exists() || tokio::fs::symlink_metadata(&link).await.is_err());
        assert!(parked.starts_with(trash_dir.join("orphans")));
    }
}
