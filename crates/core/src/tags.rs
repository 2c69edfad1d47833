//! Embedded tag reading and writing.
//!
//! [`MetadataCodec`] is the seam between the upload/edit flows and the
//! tagging library. Callers ask [`MetadataCodec::can_handle`] before touching a
//! file's tags; formats the codec cannot handle fall back to filename-derived
//! metadata and are never parsed.
//!
//! All functions here are synchronous and touch the filesystem. Async callers
//! run them under `tokio::task::spawn_blocking`.

use std::path::Path;

use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::file::{TaggedFile, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;

use crate::audio::AudioFormat;

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// The codec does not support this container.
    #[error("Tags are not supported for {0}")]
    Unsupported(AudioFormat),

    /// The file could not be opened or parsed.
    #[error("Failed to read tags: {0}")]
    Read(String),

    /// The updated tag could not be saved.
    #[error("Failed to write tags: {0}")]
    Write(String),
}

/// The tag fields this service reads from and writes to audio files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
}

/// Reads and writes [`EmbeddedTags`] for the formats it declares.
pub trait MetadataCodec: Send + Sync {
    /// Whether this codec can read and write embedded tags for `format`.
    fn can_handle(&self, format: AudioFormat) -> bool;

    /// Read the supported fields from the file at `path`.
    fn read(&self, path: &Path, format: AudioFormat) -> Result<EmbeddedTags, TagError>;

    /// Overwrite the supported fields in the file at `path`.
    ///
    /// `None` fields are removed from the file's tag.
    fn write(&self, path: &Path, format: AudioFormat, tags: &EmbeddedTags)
        -> Result<(), TagError>;
}

// ---------------------------------------------------------------------------
// lofty implementation
// ---------------------------------------------------------------------------

/// [`MetadataCodec`] backed by `lofty`.
#[derive(Debug, Clone)]
pub struct LoftyCodec {
    formats: Vec<AudioFormat>,
}

/// Formats whose tags are read and written by default.
pub const DEFAULT_TAGGED_FORMATS: &[AudioFormat] =
    &[AudioFormat::OggVorbis, AudioFormat::Flac, AudioFormat::Mp3];

impl Default for LoftyCodec {
    fn default() -> Self {
        Self::with_formats(DEFAULT_TAGGED_FORMATS.iter().copied())
    }
}

impl LoftyCodec {
    /// Build a codec that handles exactly `formats`.
    pub fn with_formats(formats: impl IntoIterator<Item = AudioFormat>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }

    fn open(&self, path: &Path, format: AudioFormat) -> Result<TaggedFile, TagError> {
        if !self.can_handle(format) {
            return Err(TagError::Unsupported(format));
        }
        // Content decides the container, not the (client-chosen) extension.
        Probe::open(path)
            .map_err(|e| TagError::Read(e.to_string()))?
            .guess_file_type()
            .map_err(|e| TagError::Read(e.to_string()))?
            .options(
                ParseOptions::new()
                    .read_cover_art(true)
                    .parsing_mode(ParsingMode::BestAttempt),
            )
            .read()
            .map_err(|e| TagError::Read(e.to_string()))
    }
}

impl MetadataCodec for LoftyCodec {
    fn can_handle(&self, format: AudioFormat) -> bool {
        self.formats.contains(&format)
    }

    fn read(&self, path: &Path, format: AudioFormat) -> Result<EmbeddedTags, TagError> {
        let tagged_file = self.open(path, format)?;

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            return Ok(EmbeddedTags::default());
        };

        Ok(EmbeddedTags {
            title: non_empty(tag.title().as_deref()),
            artist: non_empty(tag.artist().as_deref()),
            genre: non_empty(tag.genre().as_deref()),
        })
    }

    fn write(
        &self,
        path: &Path,
        format: AudioFormat,
        tags: &EmbeddedTags,
    ) -> Result<(), TagError> {
        let mut tagged_file = self.open(path, format)?;
        let tag_type = tagged_file.file_type().primary_tag_type();

        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or(TagError::Unsupported(format))?;

        match &tags.title {
            Some(title) => tag.set_title(title.clone()),
            None => tag.remove_title(),
        }
        match &tags.artist {
            Some(artist) => tag.set_artist(artist.clone()),
            None => tag.remove_artist(),
        }
        match &tags.genre {
            Some(genre) => tag.set_genre(genre.clone()),
            None => tag.remove_genre(),
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::Write(format!("{tag_type:?}: {e}")))?;

        tracing::debug!(path = %path.display(), %format, "Wrote embedded tags");
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
