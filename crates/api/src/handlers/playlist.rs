//! M3U playlist export.

use audiotracks_core::playlist::{playlist_filename, render_m3u, PlaylistEntry, M3U_CONTENT_TYPE};
use audiotracks_core::storage::join_url;
use audiotracks_db::models::track::{Track, TrackScope};
use audiotracks_db::repositories::TrackRepo;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

use crate::config::MediaConfig;
use crate::error::AppResult;
use crate::handlers::track::find_user;
use crate::state::AppState;

/// GET /api/v1/users/{username}/music/m3u
pub async fn user_playlist(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let user = find_user(&state, &username).await?;
    let tracks = TrackRepo::list_all(&state.pool, TrackScope::Owner(user.id)).await?;
    let origin = Origin::resolve(&state.config.media, &headers);

    Ok(playlist_response(&state.config.media, &origin, &user.username, &tracks))
}

/// GET /api/v1/music/m3u
///
/// All users' tracks; the attachment is named after the public host.
pub async fn global_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let tracks = TrackRepo::list_all(&state.pool, TrackScope::All).await?;
    let origin = Origin::resolve(&state.config.media, &headers);

    Ok(playlist_response(&state.config.media, &origin, &origin.host, &tracks))
}

fn playlist_response(media: &MediaConfig, origin: &Origin, scope: &str, tracks: &[Track]) -> Response {
    let entries: Vec<PlaylistEntry> = tracks
        .iter()
        .map(|track| PlaylistEntry {
            title: track.title.clone(),
            url: format!("{}{}", origin.base, join_url(&media.url, &track.audio_file)),
        })
        .collect();

    let disposition = format!("attachment; filename={}", playlist_filename(scope));
    (
        [
            (header::CONTENT_TYPE, M3U_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_m3u(&entries),
    )
        .into_response()
}

/// Scheme and host that absolute media URLs are built from.
#[derive(Debug, PartialEq, Eq)]
struct Origin {
    /// e.g. `http://testserver`, no trailing slash.
    base: String,
    /// Host part of `base`, used to name the all-users playlist.
    host: String,
}

impl Origin {
    /// `PUBLIC_BASE_URL` when configured, otherwise `http://` plus the
    /// request's `Host` header.
    fn resolve(media: &MediaConfig, headers: &HeaderMap) -> Self {
        if let Some(base) = &media.public_base_url {
            let host = base
                .split_once("://")
                .map_or(base.as_str(), |(_, rest)| rest)
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string();
            return Self {
                base: base.clone(),
                host,
            };
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost")
            .to_string();
        Self {
            base: format!("http://{host}"),
            host,
        }
    }
}
