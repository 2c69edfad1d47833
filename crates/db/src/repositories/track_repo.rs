//! Repository for the `tracks` table.
//!
//! Write methods take a `&mut SqliteConnection` so callers can run them inside
//! a transaction that also covers the matching file operations. Reads accept
//! any executor (pool or transaction).

use audiotracks_core::slug;
use audiotracks_core::types::DbId;
use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use crate::models::track::{CreateTrack, Track, TrackScope, UpdateTrack};

/// Column list shared across queries. Every read joins the owner's username.
const COLUMNS: &str = "t.id, t.user_id, u.username, t.title, t.artist, t.genre, t.date, \
                       t.description, t.slug, t.mimetype, t.filetype, t.audio_file, t.image, \
                       t.created_at, t.updated_at";

const FROM: &str = "FROM tracks t JOIN users u ON u.id = t.user_id";

/// Newest first; `id` breaks ties between rows created in the same instant.
const ORDER: &str = "ORDER BY t.created_at DESC, t.id DESC";

impl TrackScope {
    fn owner_id(self) -> Option<DbId> {
        match self {
            TrackScope::All => None,
            TrackScope::Owner(id) => Some(id),
        }
    }
}

/// Provides CRUD, slug allocation and listing for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Find a track by internal ID.
    pub async fn find_by_id(
        executor: impl SqliteExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} {FROM} WHERE t.id = $1");
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find one of `user_id`'s tracks by slug.
    pub async fn find_by_owner_and_slug(
        pool: &SqlitePool,
        user_id: DbId,
        slug: &str,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} {FROM} WHERE t.user_id = $1 AND t.slug = $2");
        sqlx::query_as::<_, Track>(&query)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Whether `user_id` already owns a track with `slug`, ignoring
    /// `exclude_id` (the track being edited).
    pub async fn slug_exists(
        executor: impl SqliteExecutor<'_>,
        user_id: DbId,
        slug: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM tracks
                WHERE user_id = $1 AND slug = $2 AND ($3 IS NULL OR id <> $3)
             )",
        )
        .bind(user_id)
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Pick the first free slug for `user_id` derived from `base`.
    ///
    /// Probes `base`, `base-2`, `base-3`, … (each cut to the slug length
    /// limit). Returns `None` when every candidate is taken.
    pub async fn allocate_slug(
        conn: &mut SqliteConnection,
        user_id: DbId,
        base: &str,
        exclude_id: Option<DbId>,
    ) -> Result<Option<String>, sqlx::Error> {
        for candidate in slug::candidates(base) {
            if !Self::slug_exists(&mut *conn, user_id, &candidate, exclude_id).await? {
                return Ok(Some(candidate));
            }
        }
        tracing::warn!(user_id, base, "Slug candidates exhausted");
        Ok(None)
    }

    /// Insert a new track, returning the created row.
    pub async fn create(
        conn: &mut SqliteConnection,
        input: &CreateTrack,
    ) -> Result<Track, sqlx::Error> {
        let now = Utc::now();
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO tracks
                (user_id, title, artist, genre, slug, mimetype, filetype, audio_file, image,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.artist)
        .bind(&input.genre)
        .bind(&input.slug)
        .bind(&input.mimetype)
        .bind(&input.filetype)
        .bind(&input.audio_file)
        .bind(&input.image)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Self::find_by_id(&mut *conn, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Overwrite a track's mutable columns.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        conn: &mut SqliteConnection,
        id: DbId,
        input: &UpdateTrack,
    ) -> Result<Option<Track>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tracks SET
                title = $2,
                artist = $3,
                genre = $4,
                date = $5,
                description = $6,
                slug = $7,
                mimetype = $8,
                filetype = $9,
                audio_file = $10,
                image = $11,
                updated_at = $12
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.artist)
        .bind(&input.genre)
        .bind(&input.date)
        .bind(&input.description)
        .bind(&input.slug)
        .bind(&input.mimetype)
        .bind(&input.filetype)
        .bind(&input.audio_file)
        .bind(&input.image)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(&mut *conn, id).await
    }

    /// Delete a track. Returns `true` if a row was removed.
    pub async fn delete(conn: &mut SqliteConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of tracks in `scope`.
    pub async fn count(pool: &SqlitePool, scope: TrackScope) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tracks WHERE ($1 IS NULL OR user_id = $1)")
            .bind(scope.owner_id())
            .fetch_one(pool)
            .await
    }

    /// One page of tracks in `scope`, newest first.
    pub async fn list_page(
        pool: &SqlitePool,
        scope: TrackScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} {FROM}
             WHERE ($1 IS NULL OR t.user_id = $1)
             {ORDER}
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(scope.owner_id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Every track in `scope`, newest first, for playlist export.
    pub async fn list_all(pool: &SqlitePool, scope: TrackScope) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} {FROM}
             WHERE ($1 IS NULL OR t.user_id = $1)
             {ORDER}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(scope.owner_id())
            .fetch_all(pool)
            .await
    }
}
