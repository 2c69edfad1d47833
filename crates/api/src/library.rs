//! Upload, edit and delete flows for tracks.
//!
//! Each flow stages its file work, does its database work inside a
//! transaction, then applies the file work and commits. A failure at any step
//! discards staged files, restores moved-aside files and rolls the
//! transaction back, so a track row never points at a missing file and no
//! stored file is left without a row.

use std::path::PathBuf;
use std::sync::Arc;

use audiotracks_core::audio::AudioFormat;
use audiotracks_core::error::CoreError;
use audiotracks_core::images::detect_image;
use audiotracks_core::slug::base_slug;
use audiotracks_core::storage::{
    self, file_stem, sanitize_filename, split_extension, with_extension, MediaKind, MediaStorage,
    PendingRemoval, StagedFile,
};
use audiotracks_core::tags::{EmbeddedTags, MetadataCodec};
use audiotracks_core::types::DbId;
use audiotracks_db::models::track::{CreateTrack, Track, UpdateTrack};
use audiotracks_db::models::user::User;
use audiotracks_db::repositories::TrackRepo;
use axum::body::Bytes;
use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

type Tx = Transaction<'static, Sqlite>;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A file part received from a multipart form.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Client-supplied filename, if any.
    pub filename: Option<String>,
    pub bytes: Bytes,
}

/// Input for [`upload_track`].
#[derive(Debug)]
pub struct NewUpload {
    pub audio: FileUpload,
    /// Name to store the audio file under; defaults to the part's filename.
    pub name: Option<String>,
    pub image: Option<FileUpload>,
}

/// Input for [`edit_track`].
///
/// `None` leaves a field unchanged. An empty string clears an optional field.
#[derive(Debug, Default)]
pub struct TrackEdit {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub audio: Option<FileUpload>,
    /// Name for a replacement audio file.
    pub name: Option<String>,
    pub image: Option<FileUpload>,
    pub delete_image: bool,
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Store a new audio file for `owner` and create its track.
///
/// Title, artist and genre come from the file's embedded tags when the codec
/// handles the format; otherwise the title is the filename without its
/// extension and nothing is parsed.
pub async fn upload_track(state: &AppState, owner: &User, upload: NewUpload) -> AppResult<Track> {
    let mut files = FileChanges::default();
    match create_in_tx(state, owner, &upload, &mut files).await {
        Ok((tx, track)) => {
            commit_with_files(state, tx, files).await?;
            tracing::info!(
                track_id = track.id,
                user_id = owner.id,
                slug = %track.slug,
                "Track uploaded"
            );
            Ok(track)
        }
        Err(e) => {
            files.discard().await;
            Err(e)
        }
    }
}

/// Apply `edit` to `track`, rewriting embedded tags when the format allows.
///
/// The caller has already checked that `owner` owns `track`.
pub async fn edit_track(
    state: &AppState,
    owner: &User,
    track: &Track,
    edit: TrackEdit,
) -> AppResult<Track> {
    let mut files = FileChanges::default();
    match update_in_tx(state, owner, track, edit, &mut files).await {
        Ok((tx, updated)) => {
            commit_with_files(state, tx, files).await?;
            tracing::info!(track_id = track.id, slug = %updated.slug, "Track edited");
            Ok(updated)
        }
        Err(e) => {
            files.discard().await;
            Err(e)
        }
    }
}

/// Delete `track` together with its stored audio file and image.
pub async fn delete_track(state: &AppState, track: &Track) -> AppResult<()> {
    let mut files = FileChanges::default();
    files.remove(track.audio_file.clone());
    if let Some(image) = &track.image {
        files.remove(image.clone());
    }

    let mut tx = state.pool.begin().await?;
    if !TrackRepo::delete(&mut tx, track.id).await? {
        return Err(CoreError::NotFound {
            entity: "Track",
            id: track.id,
        }
        .into());
    }
    commit_with_files(state, tx, files).await?;

    tracing::info!(track_id = track.id, user_id = track.user_id, "Track deleted");
    Ok(())
}

async fn create_in_tx(
    state: &AppState,
    owner: &User,
    upload: &NewUpload,
    files: &mut FileChanges,
) -> AppResult<(Tx, Track)> {
    let audio = stage_audio(state, owner, &upload.audio, upload.name.as_deref(), files).await?;
    let image = match &upload.image {
        Some(image) => Some(stage_image(state, owner, image, files).await?),
        None => None,
    };

    let tags = if state.codec.can_handle(audio.format) {
        read_tags(&state.codec, files.staged_path(audio.slot), audio.format).await?
    } else {
        tracing::debug!(format = %audio.format, "Format has no tag support, naming from file");
        EmbeddedTags::default()
    };
    let title = tags.title.unwrap_or_else(|| audio.fallback_title.clone());
    let base = base_slug(&title);

    let mut tx = state.pool.begin().await?;
    let slug = allocate_slug(&mut tx, owner.id, &base, None).await?;

    let audio_file = state
        .storage
        .available_name(MediaKind::Audio, &owner.username, &audio.filename, None)
        .await?;
    files.place(audio.slot, audio_file.clone());

    let image_file = match image {
        Some(image) => {
            let relative = state
                .storage
                .available_name(MediaKind::Image, &owner.username, &image.filename, None)
                .await?;
            files.place(image.slot, relative.clone());
            Some(relative)
        }
        None => None,
    };

    let track = TrackRepo::create(
        &mut tx,
        &CreateTrack {
            user_id: owner.id,
            title,
            artist: tags.artist,
            genre: tags.genre,
            slug,
            mimetype: Some(audio.format.mimetype().to_string()),
            filetype: Some(audio.format.label().to_string()),
            audio_file,
            image: image_file,
        },
    )
    .await?;

    Ok((tx, track))
}

async fn update_in_tx(
    state: &AppState,
    owner: &User,
    track: &Track,
    edit: TrackEdit,
    files: &mut FileChanges,
) -> AppResult<(Tx, Track)> {
    let mut changes = UpdateTrack::from_track(track);

    if let Some(title) = edit.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("Title must not be empty".into()).into());
        }
        changes.title = title.to_string();
    }
    set_optional(&mut changes.artist, edit.artist);
    set_optional(&mut changes.genre, edit.genre);
    set_optional(&mut changes.date, edit.date);
    set_optional(&mut changes.description, edit.description);

    let tags_changed = changes.title != track.title
        || changes.artist != track.artist
        || changes.genre != track.genre;

    let audio = match &edit.audio {
        Some(upload) => Some(stage_audio(state, owner, upload, edit.name.as_deref(), files).await?),
        None => None,
    };
    let image = match &edit.image {
        Some(image) => Some(stage_image(state, owner, image, files).await?),
        None => None,
    };

    let format = match &audio {
        Some(audio) => {
            changes.mimetype = Some(audio.format.mimetype().to_string());
            changes.filetype = Some(audio.format.label().to_string());
            Some(audio.format)
        }
        None => track.filetype.as_deref().and_then(AudioFormat::from_label),
    };

    // Tags go into the replacement file, or into a copy of the current one.
    let mut rewritten_copy = None;
    if let Some(format) = format.filter(|f| state.codec.can_handle(*f)) {
        let target = match &audio {
            Some(audio) => Some(audio.slot),
            None if tags_changed => {
                let copy = state.storage.stage_copy(&track.audio_file).await?;
                let slot = files.hold(copy);
                rewritten_copy = Some(slot);
                Some(slot)
            }
            None => None,
        };
        if let Some(slot) = target {
            let tags = EmbeddedTags {
                title: Some(changes.title.clone()),
                artist: changes.artist.clone(),
                genre: changes.genre.clone(),
            };
            write_tags(&state.codec, files.staged_path(slot), format, tags).await?;
        }
    }

    let slug_base = match edit.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(requested) => Some(base_slug(requested)),
        None if changes.title != track.title => Some(base_slug(&changes.title)),
        None => None,
    };

    let mut tx = state.pool.begin().await?;
    if let Some(base) = slug_base {
        changes.slug = allocate_slug(&mut tx, track.user_id, &base, Some(track.id)).await?;
    }

    if let Some(audio) = &audio {
        let target = state
            .storage
            .available_name(
                MediaKind::Audio,
                &owner.username,
                &audio.filename,
                Some(&track.audio_file),
            )
            .await?;
        files.remove(track.audio_file.clone());
        files.place(audio.slot, target.clone());
        changes.audio_file = target;
    } else if let Some(slot) = rewritten_copy {
        files.remove(track.audio_file.clone());
        files.place(slot, track.audio_file.clone());
    }

    if let Some(image) = &image {
        let target = state
            .storage
            .available_name(
                MediaKind::Image,
                &owner.username,
                &image.filename,
                track.image.as_deref(),
            )
            .await?;
        if let Some(old) = &track.image {
            files.remove(old.clone());
        }
        files.place(image.slot, target.clone());
        changes.image = Some(target);
    } else if edit.delete_image {
        if let Some(old) = &track.image {
            files.remove(old.clone());
        }
        changes.image = None;
    }

    let updated = TrackRepo::update(&mut tx, track.id, &changes)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Track",
            id: track.id,
        })?;

    Ok((tx, updated))
}

/// Apply the file side, then commit. If the commit fails the applied file
/// changes are reverted.
async fn commit_with_files(state: &AppState, tx: Tx, files: FileChanges) -> AppResult<()> {
    // Dropping `tx` on the error path rolls it back.
    let applied = files.apply(&state.storage).await?;

    if let Err(e) = tx.commit().await {
        applied.revert(&state.storage).await;
        return Err(e.into());
    }
    applied.finish().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Staging helpers
// ---------------------------------------------------------------------------

struct StagedAudio {
    slot: Slot,
    filename: String,
    fallback_title: String,
    format: AudioFormat,
}

struct StagedImage {
    slot: Slot,
    filename: String,
}

async fn stage_audio(
    state: &AppState,
    owner: &User,
    upload: &FileUpload,
    name: Option<&str>,
    files: &mut FileChanges,
) -> AppResult<StagedAudio> {
    let raw = non_blank(name)
        .or_else(|| non_blank(upload.filename.as_deref()))
        .ok_or_else(|| CoreError::Validation("The audio file needs a name".into()))?;
    let display = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let format = AudioFormat::detect(&upload.bytes)?;

    let mut filename = sanitize_filename(display)?;
    if split_extension(&filename).1.is_none() {
        filename = format!("{filename}.{}", format.extension());
    }

    let fallback_title = match file_stem(display).trim() {
        "" => file_stem(&filename).to_string(),
        stem => stem.to_string(),
    };

    let staged = state
        .storage
        .stage(MediaKind::Audio, &owner.username, &filename, &upload.bytes)
        .await?;

    Ok(StagedAudio {
        slot: files.hold(staged),
        filename,
        fallback_title,
        format,
    })
}

async fn stage_image(
    state: &AppState,
    owner: &User,
    upload: &FileUpload,
    files: &mut FileChanges,
) -> AppResult<StagedImage> {
    let ext = detect_image(&upload.bytes)?;
    let name = upload
        .filename
        .as_deref()
        .and_then(|n| sanitize_filename(n).ok())
        .unwrap_or_else(|| "image".to_string());
    let filename = with_extension(&name, ext);

    let staged = state
        .storage
        .stage(MediaKind::Image, &owner.username, &filename, &upload.bytes)
        .await?;

    Ok(StagedImage {
        slot: files.hold(staged),
        filename,
    })
}

async fn allocate_slug(
    conn: &mut SqliteConnection,
    owner_id: DbId,
    base: &str,
    exclude_id: Option<DbId>,
) -> AppResult<String> {
    TrackRepo::allocate_slug(conn, owner_id, base, exclude_id)
        .await?
        .ok_or_else(|| CoreError::Conflict(format!("No free slug left for '{base}'")).into())
}

async fn read_tags(
    codec: &Arc<dyn MetadataCodec>,
    path: PathBuf,
    format: AudioFormat,
) -> AppResult<EmbeddedTags> {
    let codec = Arc::clone(codec);
    tokio::task::spawn_blocking(move || codec.read(&path, format))
        .await
        .map_err(|e| AppError::InternalError(format!("Tag reader task failed: {e}")))?
        .map_err(AppError::from)
}

async fn write_tags(
    codec: &Arc<dyn MetadataCodec>,
    path: PathBuf,
    format: AudioFormat,
    tags: EmbeddedTags,
) -> AppResult<()> {
    let codec = Arc::clone(codec);
    tokio::task::spawn_blocking(move || codec.write(&path, format, &tags))
        .await
        .map_err(|e| AppError::InternalError(format!("Tag writer task failed: {e}")))?
        .map_err(AppError::from)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn set_optional(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = non_blank(Some(&value)).map(str::to_string);
    }
}

// ---------------------------------------------------------------------------
// File changes
// ---------------------------------------------------------------------------

/// Index of a staged file held by [`FileChanges`].
#[derive(Debug, Clone, Copy)]
struct Slot(usize);

struct Pending {
    file: StagedFile,
    target: Option<String>,
}

/// File operations belonging to one database transaction.
///
/// Staged files are held from the moment they are written; their final
/// location is set once the transaction has picked it.
#[derive(Default)]
struct FileChanges {
    staged: Vec<Pending>,
    removals: Vec<String>,
}

impl FileChanges {
    fn hold(&mut self, file: StagedFile) -> Slot {
        self.staged.push(Pending { file, target: None });
        Slot(self.staged.len() - 1)
    }

    fn staged_path(&self, slot: Slot) -> PathBuf {
        self.staged[slot.0].file.path().to_path_buf()
    }

    fn place(&mut self, slot: Slot, relative: String) {
        self.staged[slot.0].target = Some(relative);
    }

    fn remove(&mut self, relative: String) {
        self.removals.push(relative);
    }

    async fn discard(self) {
        for pending in self.staged {
            pending.file.discard().await;
        }
    }

    /// Move removed files aside, then promote staged files into place.
    ///
    /// On failure everything done so far is undone and the rest discarded.
    async fn apply(self, storage: &MediaStorage) -> Result<AppliedFiles, CoreError> {
        let FileChanges { staged, removals } = self;
        let mut staged = staged.into_iter();
        let mut applied = AppliedFiles::default();

        for relative in &removals {
            match storage.stage_removal(relative).await {
                Ok(Some(removal)) => applied.removed.push(removal),
                Ok(None) => {}
                Err(e) => {
                    for pending in staged.by_ref() {
                        pending.file.discard().await;
                    }
                    applied.revert(storage).await;
                    return Err(e);
                }
            }
        }

        while let Some(pending) = staged.next() {
            let Some(target) = pending.target else {
                pending.file.discard().await;
                continue;
            };
            if let Err(e) = pending.file.promote(storage, &target).await {
                for rest in staged.by_ref() {
                    rest.file.discard().await;
                }
                applied.revert(storage).await;
                return Err(e);
            }
            applied.promoted.push(target);
        }

        Ok(applied)
    }
}

/// File operations already applied, awaiting the transaction outcome.
#[derive(Default)]
struct AppliedFiles {
    promoted: Vec<String>,
    removed: Vec<PendingRemoval>,
}

impl AppliedFiles {
    /// Remove promoted files and put moved-aside files back.
    async fn revert(self, storage: &MediaStorage) {
        for relative in &self.promoted {
            if let Err(e) = storage.remove(relative).await {
                tracing::error!(path = %relative, error = %e, "Failed to back out promoted file");
            }
        }
        storage::restore_all(self.removed).await;
    }

    /// Permanently delete moved-aside files.
    async fn finish(self) {
        storage::purge_all(self.removed).await;
    }
}
