pub mod auth;
pub mod health;
pub mod music;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user
///
/// /music/upload                                    upload (multipart)
/// /music/edit/{id}                                 edit (multipart, owner)
/// /music/confirm_delete/{id}                       delete prompt (owner)
/// /music/delete                                    delete (owner)
/// /music/tracks                                    latest tracks, page 1
/// /music/tracks/{page}                             latest tracks
/// /music/m3u                                       playlist of every track
///
/// /users/{username}/music/tracks                   user's tracks, page 1
/// /users/{username}/music/tracks/{page}            user's tracks
/// /users/{username}/music/track/{slug}             single track
/// /users/{username}/music/m3u                      user's playlist
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/music", music::router())
        .nest("/users/{username}/music", users::router())
}
