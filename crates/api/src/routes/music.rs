//! Route definitions for the site-wide `/music` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{playlist, track};
use crate::state::AppState;

/// Routes mounted at `/music`.
///
/// ```text
/// POST /upload              -> upload
/// POST /edit/{id}           -> edit
/// GET  /confirm_delete/{id} -> confirm_delete
/// POST /delete              -> delete
/// GET  /tracks              -> list_latest
/// GET  /tracks/{page}       -> list_latest_page
/// GET  /m3u                 -> global_playlist
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(track::upload))
        .route("/edit/{id}", post(track::edit))
        .route("/confirm_delete/{id}", get(track::confirm_delete))
        .route("/delete", post(track::delete))
        .route("/tracks", get(track::list_latest))
        .route("/tracks/{page}", get(track::list_latest_page))
        .route("/m3u", get(playlist::global_playlist))
}
