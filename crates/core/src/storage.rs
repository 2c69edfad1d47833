//! On-disk media layout and two-phase file operations.
//!
//! Layout: `<root>/audiotracks/<kind>/<username>/<filename>`, where `kind` is
//! `audio_files` or `images`. Paths stored in the database are relative to
//! `<root>` and always use `/` separators.
//!
//! Writes and removals are two-phase so that a database transaction can sit
//! between them:
//!
//! - [`MediaStorage::stage`] writes bytes to a hidden temp file next to the
//!   destination; [`StagedFile::promote`] renames it into place and
//!   [`StagedFile::discard`] deletes it.
//! - [`MediaStorage::stage_removal`] renames a stored file aside;
//!   [`PendingRemoval::purge`] deletes it and [`PendingRemoval::restore`]
//!   puts it back.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::CoreError;

/// Top-level directory under the media root that this service owns.
pub const NAMESPACE: &str = "audiotracks";

/// Longest stored filename, in bytes.
pub const MAX_FILENAME_LEN: usize = 200;

/// What kind of media a stored file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    fn dir_name(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio_files",
            MediaKind::Image => "images",
        }
    }
}

// ---------------------------------------------------------------------------
// Filename helpers
// ---------------------------------------------------------------------------

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory components are stripped, spaces become `_`, and anything other
/// than ASCII alphanumerics, `_`, `-` and `.` is removed.
pub fn sanitize_filename(name: &str) -> Result<String, CoreError> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("").trim();

    let cleaned: String = last
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => Some(c),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return Err(CoreError::Validation(format!("Invalid filename '{name}'")));
    }

    if cleaned.len() <= MAX_FILENAME_LEN {
        return Ok(cleaned.to_string());
    }

    // Keep the extension when shortening.
    let (stem, ext) = split_extension(cleaned);
    let ext_len = ext.map_or(0, |e| e.len() + 1);
    let stem = &stem[..MAX_FILENAME_LEN.saturating_sub(ext_len).min(stem.len())];
    Ok(match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    })
}

/// Split `name` into stem and extension (without the dot).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Filename without its extension, used as the fallback track title.
pub fn file_stem(name: &str) -> &str {
    split_extension(name).0
}

/// Replace the extension of `name` with `ext`.
pub fn with_extension(name: &str, ext: &str) -> String {
    format!("{}.{ext}", file_stem(name))
}

/// Join a relative media path onto a URL prefix such as `/media`.
pub fn join_url(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    format!("{prefix}/{}", relative.trim_start_matches('/'))
}

fn hidden_sibling(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let (stem, ext) = split_extension(name);
    let ext = ext.unwrap_or("tmp");
    path.with_file_name(format!(".{stem}.{tag}-{}.{ext}", Uuid::new_v4().simple()))
}

fn storage_err(action: &str, path: &Path, err: std::io::Error) -> CoreError {
    CoreError::Storage(format!("Failed to {action} {}: {err}", path.display()))
}

// ---------------------------------------------------------------------------
// MediaStorage
// ---------------------------------------------------------------------------

/// Local-filesystem media store rooted at `root`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Relative directory for `kind` files owned by `username`.
    pub fn relative_dir(kind: MediaKind, username: &str) -> String {
        format!("{NAMESPACE}/{}/{username}", kind.dir_name())
    }

    /// Absolute filesystem path of a stored relative path.
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|seg| !seg.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Pick a relative path for `filename` in the owner's directory that no
    /// existing file occupies, suffixing the stem with `_2`, `_3`, … as needed.
    ///
    /// `reusable` names a path the caller already owns and may overwrite.
    pub async fn available_name(
        &self,
        kind: MediaKind,
        username: &str,
        filename: &str,
        reusable: Option<&str>,
    ) -> Result<String, CoreError> {
        let dir = Self::relative_dir(kind, username);
        let (stem, ext) = split_extension(filename);

        for n in 1u32.. {
            let candidate_name = match (n, ext) {
                (1, _) => filename.to_string(),
                (_, Some(ext)) => format!("{stem}_{n}.{ext}"),
                (_, None) => format!("{stem}_{n}"),
            };
            let relative = format!("{dir}/{candidate_name}");
            if reusable == Some(relative.as_str()) {
                return Ok(relative);
            }
            let absolute = self.absolute_path(&relative);
            let exists = tokio::fs::try_exists(&absolute)
                .await
                .map_err(|e| storage_err("inspect", &absolute, e))?;
            if !exists {
                return Ok(relative);
            }
        }
        Err(CoreError::Storage(format!(
            "No free filename left for '{filename}' in {dir}"
        )))
    }

    /// Write `bytes` to a hidden temp file inside the owner's `kind`
    /// directory. The file keeps `filename`'s extension so format probing by
    /// extension still works on the staged copy.
    pub async fn stage(
        &self,
        kind: MediaKind,
        username: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StagedFile, CoreError> {
        let dir = self.absolute_path(&Self::relative_dir(kind, username));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_err("create directory", &dir, e))?;

        let path = hidden_sibling(&dir.join(filename), "upload");
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| storage_err("write", &path, e))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Staged upload");
        Ok(StagedFile { path })
    }

    /// Copy an already stored file to a staged sibling so it can be modified
    /// without touching the original until promotion.
    pub async fn stage_copy(&self, relative: &str) -> Result<StagedFile, CoreError> {
        let source = self.absolute_path(relative);
        let path = hidden_sibling(&source, "edit");
        tokio::fs::copy(&source, &path)
            .await
            .map_err(|e| storage_err("copy", &source, e))?;
        Ok(StagedFile { path })
    }

    /// Delete a stored file outright. A missing file is not an error.
    ///
    /// Used to back out a file that was promoted before its database
    /// transaction failed.
    pub async fn remove(&self, relative: &str) -> Result<(), CoreError> {
        let path = self.absolute_path(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("delete", &path, e)),
        }
    }

    /// Move a stored file aside so its removal can be undone.
    ///
    /// Returns `Ok(None)` when the file is already gone.
    pub async fn stage_removal(&self, relative: &str) -> Result<Option<PendingRemoval>, CoreError> {
        let original = self.absolute_path(relative);
        let parked = hidden_sibling(&original, "trash");
        match tokio::fs::rename(&original, &parked).await {
            Ok(()) => Ok(Some(PendingRemoval { original, parked })),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %original.display(), "Stored file already missing");
                Ok(None)
            }
            Err(e) => Err(storage_err("move aside", &original, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Staged writes
// ---------------------------------------------------------------------------

/// A temp file waiting to be promoted into place or discarded.
#[derive(Debug)]
#[must_use = "a staged file must be promoted or discarded"]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Filesystem path of the staged bytes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the staged file to `relative` under `storage`, replacing any
    /// file already there.
    pub async fn promote(self, storage: &MediaStorage, relative: &str) -> Result<(), CoreError> {
        let target = storage.absolute_path(relative);
        if let Err(e) = tokio::fs::rename(&self.path, &target).await {
            let err = storage_err("move into place", &target, e);
            self.discard().await;
            return Err(err);
        }
        Ok(())
    }

    /// Delete the staged file. Failures are logged, not returned.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to discard staged file");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Staged removals
// ---------------------------------------------------------------------------

/// A stored file that has been moved aside pending deletion.
#[derive(Debug)]
#[must_use = "a pending removal must be purged or restored"]
pub struct PendingRemoval {
    original: PathBuf,
    parked: PathBuf,
}

impl PendingRemoval {
    /// Permanently delete the parked file.
    pub async fn purge(self) -> Result<(), CoreError> {
        match tokio::fs::remove_file(&self.parked).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("delete", &self.parked, e)),
        }
    }

    /// Move the parked file back to its original location.
    pub async fn restore(self) -> Result<(), CoreError> {
        tokio::fs::rename(&self.parked, &self.original)
            .await
            .map_err(|e| storage_err("restore", &self.original, e))
    }
}

/// Purge every removal, logging failures. Used once the database change that
/// made the files obsolete has been committed.
pub async fn purge_all(removals: Vec<PendingRemoval>) {
    for removal in removals {
        let parked = removal.parked.clone();
        if let Err(e) = removal.purge().await {
            tracing::warn!(path = %parked.display(), error = %e, "Failed to purge removed file");
        }
    }
}

/// Restore every removal, logging failures. Used when the database change
/// was rolled back.
pub async fn restore_all(removals: Vec<PendingRemoval>) {
    for removal in removals {
        let original = removal.original.clone();
        if let Err(e) = removal.restore().await {
            tracing::error!(path = %original.display(), error = %e, "Failed to restore removed file");
        }
    }
}
