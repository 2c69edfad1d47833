//! Track entity model and DTOs.

use audiotracks_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `tracks`, joined with its owner's username.
///
/// `audio_file` and `image` are paths relative to the media root.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub slug: String,
    pub mimetype: Option<String>,
    pub filetype: Option<String>,
    pub audio_file: String,
    pub image: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a freshly uploaded track.
#[derive(Debug, Clone)]
pub struct CreateTrack {
    pub user_id: DbId,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub slug: String,
    pub mimetype: Option<String>,
    pub filetype: Option<String>,
    pub audio_file: String,
    pub image: Option<String>,
}

/// The complete post-edit state of a track's mutable columns.
///
/// Edits compute every field up front, so `None` here means "clear the
/// column", not "leave unchanged".
#[derive(Debug, Clone)]
pub struct UpdateTrack {
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub slug: String,
    pub mimetype: Option<String>,
    pub filetype: Option<String>,
    pub audio_file: String,
    pub image: Option<String>,
}

impl UpdateTrack {
    /// Start from a track's current values.
    pub fn from_track(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            genre: track.genre.clone(),
            date: track.date.clone(),
            description: track.description.clone(),
            slug: track.slug.clone(),
            mimetype: track.mimetype.clone(),
            filetype: track.filetype.clone(),
            audio_file: track.audio_file.clone(),
            image: track.image.clone(),
        }
    }
}

/// Which tracks a listing or playlist covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackScope {
    /// Every user's tracks.
    All,
    /// Tracks owned by one user.
    Owner(DbId),
}
