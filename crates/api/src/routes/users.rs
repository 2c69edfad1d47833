//! Route definitions for per-user music, mounted at `/users/{username}/music`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{playlist, track};
use crate::state::AppState;

/// ```text
/// GET /tracks          -> list_user
/// GET /tracks/{page}   -> list_user_page
/// GET /track/{slug}    -> get_by_slug
/// GET /m3u             -> user_playlist
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tracks", get(track::list_user))
        .route("/tracks/{page}", get(track::list_user_page))
        .route("/track/{slug}", get(track::get_by_slug))
        .route("/m3u", get(playlist::user_playlist))
}
