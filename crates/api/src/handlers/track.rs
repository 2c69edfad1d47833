//! Handlers for tracks: upload, edit, delete, listings and single lookups.

use std::collections::HashMap;

use audiotracks_core::error::CoreError;
use audiotracks_core::pagination::PageInfo;
use audiotracks_core::types::DbId;
use audiotracks_db::models::track::{Track, TrackScope};
use audiotracks_db::models::user::User;
use audiotracks_db::repositories::{TrackRepo, UserRepo};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::auth::load_account;
use crate::library::{self, FileUpload, NewUpload, TrackEdit};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, TrackPage, TrackResponse};
use crate::state::AppState;

/// Multipart fields carrying files; everything else is read as text.
const FILE_FIELDS: &[&str] = &["audio_file", "image"];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /music/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub track_id: DbId,
    /// Local path to redirect to after deleting.
    pub came_from: Option<String>,
}

/// Payload for `GET /music/confirm_delete/{id}`.
#[derive(Debug, Serialize)]
pub struct ConfirmDelete {
    pub track: TrackResponse,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/music/upload
///
/// Multipart fields: `audio_file` (required), `name`, `image`.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<TrackResponse>>)> {
    let owner = load_account(&state, &auth).await?;
    let mut form = read_form(multipart).await?;

    let audio = form.files.remove("audio_file").ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "Missing required 'audio_file' field".into(),
        ))
    })?;
    let upload = NewUpload {
        audio,
        name: form.text("name"),
        image: form.files.remove("image"),
    };

    let track = library::upload_track(&state, &owner, upload).await?;
    Ok((StatusCode::CREATED, Json(track_data(&state, track))))
}

/// POST /api/v1/music/edit/{id}
///
/// Multipart fields (all optional): `title`, `artist`, `genre`, `date`,
/// `description`, `slug`, `audio_file` + `name`, `image`, `delete_image`.
pub async fn edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<TrackResponse>>> {
    let track = find_owned_track(&state, &auth, id).await?;
    let owner = load_account(&state, &auth).await?;
    let mut form = read_form(multipart).await?;

    let edit = TrackEdit {
        title: form.text("title"),
        artist: form.text("artist"),
        genre: form.text("genre"),
        date: form.text("date"),
        description: form.text("description"),
        slug: form.text("slug"),
        name: form.text("name"),
        delete_image: form.text("delete_image").is_some_and(|v| is_truthy(&v)),
        audio: form.files.remove("audio_file"),
        image: form.files.remove("image"),
    };

    let updated = library::edit_track(&state, &owner, &track, edit).await?;
    Ok(Json(track_data(&state, updated)))
}

/// GET /api/v1/music/confirm_delete/{id}
pub async fn confirm_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConfirmDelete>>> {
    let track = find_owned_track(&state, &auth, id).await?;
    load_account(&state, &auth).await?;
    let message = format!("Are you sure you want to delete '{}'?", track.title);
    Ok(Json(DataResponse {
        data: ConfirmDelete {
            track: TrackResponse::new(track, &state.config.media.url),
            message,
        },
    }))
}

/// POST /api/v1/music/delete
///
/// Redirects (303) to `came_from` when it is a local path, otherwise 204.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<DeleteRequest>,
) -> AppResult<Response> {
    let track = find_owned_track(&state, &auth, input.track_id).await?;
    load_account(&state, &auth).await?;
    library::delete_track(&state, &track).await?;

    Ok(match input.came_from.as_deref().filter(|p| is_local_path(p)) {
        Some(path) => Redirect::to(path).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/v1/music/tracks
pub async fn list_latest(State(state): State<AppState>) -> AppResult<Json<DataResponse<TrackPage>>> {
    track_page(&state, TrackScope::All, 1).await
}

/// GET /api/v1/music/tracks/{page}
pub async fn list_latest_page(
    State(state): State<AppState>,
    Path(page): Path<i64>,
) -> AppResult<Json<DataResponse<TrackPage>>> {
    track_page(&state, TrackScope::All, page).await
}

/// GET /api/v1/users/{username}/music/tracks
pub async fn list_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<DataResponse<TrackPage>>> {
    let user = find_user(&state, &username).await?;
    track_page(&state, TrackScope::Owner(user.id), 1).await
}

/// GET /api/v1/users/{username}/music/tracks/{page}
pub async fn list_user_page(
    State(state): State<AppState>,
    Path((username, page)): Path<(String, i64)>,
) -> AppResult<Json<DataResponse<TrackPage>>> {
    let user = find_user(&state, &username).await?;
    track_page(&state, TrackScope::Owner(user.id), page).await
}

/// GET /api/v1/users/{username}/music/track/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<TrackResponse>>> {
    let user = find_user(&state, &username).await?;
    let track = TrackRepo::find_by_owner_and_slug(&state.pool, user.id, &slug)
        .await?
        .ok_or(CoreError::NotFoundByKey {
            entity: "Track",
            key: slug,
        })?;
    Ok(Json(track_data(&state, track)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn track_page(
    state: &AppState,
    scope: TrackScope,
    page: i64,
) -> AppResult<Json<DataResponse<TrackPage>>> {
    let total = TrackRepo::count(&state.pool, scope).await?;
    let info = PageInfo::new(page, state.config.tracks_per_page, total)?;
    let tracks = TrackRepo::list_page(&state.pool, scope, info.limit(), info.offset()).await?;

    let media_url = &state.config.media.url;
    Ok(Json(DataResponse {
        data: TrackPage {
            tracks: tracks
                .into_iter()
                .map(|t| TrackResponse::new(t, media_url))
                .collect(),
            has_next: info.has_next(),
            has_previous: info.has_previous(),
            page: info,
        },
    }))
}

/// Look up a user by username, 404 if unknown.
pub async fn find_user(state: &AppState, username: &str) -> AppResult<User> {
    UserRepo::find_by_username(&state.pool, username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "User",
                key: username.to_string(),
            })
        })
}

/// Existence is checked before ownership: unknown ids are 404 for everyone.
async fn find_owned_track(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<Track> {
    let track = TrackRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Track", id })?;
    auth.ensure_owner(track.user_id)?;
    Ok(track)
}

fn track_data(state: &AppState, track: Track) -> DataResponse<TrackResponse> {
    DataResponse {
        data: TrackResponse::new(track, &state.config.media.url),
    }
}

/// Text and file parts of a multipart form, keyed by field name.
#[derive(Default)]
struct Form {
    texts: HashMap<String, String>,
    files: HashMap<String, FileUpload>,
}

impl Form {
    fn text(&mut self, name: &str) -> Option<String> {
        self.texts.remove(name)
    }
}

/// Drain a multipart body. File parts with no content count as absent, the
/// way browsers submit an untouched file input.
async fn read_form(mut multipart: Multipart) -> AppResult<Form> {
    let mut form = Form::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if FILE_FIELDS.contains(&name.as_str()) {
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if !bytes.is_empty() {
                form.files.insert(name, FileUpload { filename, bytes });
            }
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            form.texts.insert(name, text);
        }
    }

    Ok(form)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// A same-origin path: starts with `/` but is not protocol-relative.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_checkbox_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("on"));
        assert!(is_truthy("True"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn only_local_paths_are_redirect_targets() {
        assert!(is_local_path("/somewhere"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
    }
}
