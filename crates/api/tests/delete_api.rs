//! HTTP-level tests for the confirm-then-delete flow.

mod common;

use axum::http::{header, StatusCode};
use common::{
    body_json, dir_entries, get, get_auth, post_json_auth, post_multipart, signup, stored,
    upload_fixture, Multipart,
};
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_delete_prompts_with_the_title(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;
    let track = upload_fixture(&app, &token, "audio_file.ogg").await;

    let uri = format!("/api/v1/music/confirm_delete/{}", track["id"]);
    let response = get_auth(&app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json["data"]["message"],
        "Are you sure you want to delete 'audiotracks test file'?"
    );
    assert_eq!(json["data"]["track"]["id"], track["id"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_removes_row_and_files(pool: SqlitePool) {
    let (app, media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;

    let form = Multipart::new()
        .fixture("audio_file", "audio_file.ogg")
        .fixture("image", "image.jpg");
    let response = post_multipart(&app, "/api/v1/music/upload", Some(&token), form).await;
    let track = body_json(response).await["data"].clone();
    let audio = stored(&media, &track["audio_file"]);
    let image = stored(&media, &track["image"]);

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &token,
        json!({ "track_id": track["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!audio.exists());
    assert!(!image.exists());
    let listing = body_json(get(&app, "/api/v1/users/alice/music/tracks").await).await;
    assert_eq!(listing["data"]["total"], 0);
    assert_eq!(listing["data"]["tracks"], json!([]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_redirects_to_local_came_from(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;
    let track = upload_fixture(&app, &token, "audio_file.wav").await;

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &token,
        json!({ "track_id": track["id"], "came_from": "/users/alice/music" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/users/alice/music");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_ignores_offsite_came_from(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;
    let track = upload_fixture(&app, &token, "audio_file.wav").await;

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &token,
        json!({ "track_id": track["id"], "came_from": "//evil.example.com/" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn non_owner_cannot_delete(pool: SqlitePool) {
    let (app, media) = common::build_test_app(pool);
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let track = upload_fixture(&app, &alice, "audio_file.ogg").await;

    let uri = format!("/api/v1/music/confirm_delete/{}", track["id"]);
    assert_eq!(get_auth(&app, &uri, &bob).await.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &bob,
        json!({ "track_id": track["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(stored(&media, &track["audio_file"]).is_file());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deleting_twice_is_not_found(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;
    let track = upload_fixture(&app, &token, "audio_file.wav").await;
    let body = json!({ "track_id": track["id"] });

    let first = post_json_auth(&app, "/api/v1/music/delete", &token, body.clone()).await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = post_json_auth(&app, "/api/v1/music/delete", &token, body).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn storage_failure_keeps_track_and_files(pool: SqlitePool) {
    let (app, media) = common::build_test_app(pool);
    let token = signup(&app, "alice").await;

    let form = Multipart::new()
        .fixture("audio_file", "audio_file.ogg")
        .fixture("image", "image.jpg");
    let response = post_multipart(&app, "/api/v1/music/upload", Some(&token), form).await;
    let track = body_json(response).await["data"].clone();
    let audio = stored(&media, &track["audio_file"]);
    let image = stored(&media, &track["image"]);

    // A plain file where the image directory should be makes moving the
    // image aside fail after the audio file has already been moved.
    let image_dir = media.path().join("audiotracks/images/alice");
    let held = media.path().join("audiotracks/images/alice.held");
    std::fs::rename(&image_dir, &held).unwrap();
    std::fs::write(&image_dir, b"").unwrap();

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &token,
        json!({ "track_id": track["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "STORAGE_ERROR");

    std::fs::remove_file(&image_dir).unwrap();
    std::fs::rename(&held, &image_dir).unwrap();

    assert!(audio.is_file());
    assert!(image.is_file());
    assert_eq!(
        dir_entries(audio.parent().unwrap()),
        vec!["audio_file.ogg".to_string()]
    );
    let listing = body_json(get(&app, "/api/v1/users/alice/music/tracks").await).await;
    assert_eq!(listing["data"]["total"], 1);
    assert_eq!(listing["data"]["tracks"][0]["id"], track["id"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deactivated_owner_cannot_delete(pool: SqlitePool) {
    let (app, media) = common::build_test_app(pool.clone());
    let token = signup(&app, "alice").await;
    let track = upload_fixture(&app, &token, "audio_file.ogg").await;

    sqlx::query("UPDATE users SET is_active = 0 WHERE username = $1")
        .bind("alice")
        .execute(&pool)
        .await
        .unwrap();

    let uri = format!("/api/v1/music/confirm_delete/{}", track["id"]);
    assert_eq!(get_auth(&app, &uri, &token).await.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        "/api/v1/music/delete",
        &token,
        json!({ "track_id": track["id"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(stored(&media, &track["audio_file"]).is_file());
    let listing = body_json(get(&app, "/api/v1/users/alice/music/tracks").await).await;
    assert_eq!(listing["data"]["total"], 1);
}
