//! Shared response envelope types for API handlers.
//!
//! All JSON responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })`.

use audiotracks_core::pagination::PageInfo;
use audiotracks_core::storage::join_url;
use audiotracks_db::models::track::Track;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// A track as returned by the API, with media URLs resolved against
/// `MEDIA_URL`.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    #[serde(flatten)]
    pub track: Track,
    pub audio_url: String,
    pub image_url: Option<String>,
}

impl TrackResponse {
    pub fn new(track: Track, media_url: &str) -> Self {
        let audio_url = join_url(media_url, &track.audio_file);
        let image_url = track.image.as_deref().map(|image| join_url(media_url, image));
        Self {
            track,
            audio_url,
            image_url,
        }
    }
}

/// One page of a track listing.
#[derive(Debug, Serialize)]
pub struct TrackPage {
    pub tracks: Vec<TrackResponse>,
    #[serde(flatten)]
    pub page: PageInfo,
    pub has_next: bool,
    pub has_previous: bool,
}
