//! Song repository trait and implementation

use crate::error::{CatalogError, Result};
use crate::models::{NewSong, Song};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use tracing::debug;

/// Song repository interface for data access operations
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Find a song by its ID
    ///
    /// # Returns
    /// - `Ok(Some(song))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: i64) -> Result<Option<Song>>;

    /// Insert a new song and return it with its assigned id
    ///
    /// # Errors
    /// Returns error if validation fails or a database error occurs
    async fn insert(&self, song: &NewSong) -> Result<Song>;

    /// Overwrite an existing song
    ///
    /// # Errors
    /// Returns error if:
    /// - Song does not exist
    /// - Song validation fails
    /// - Database error occurs
    async fn update(&self, song: &Song) -> Result<Song>;

    /// Count all songs
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn fetch(&self, id: i64) -> Result<Song> {
        self.find_by_id(id).await?.ok_or_else(|| CatalogError::NotFound {
            entity_type: "Song".to_string(),
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        let song = query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn insert(&self, song: &NewSong) -> Result<Song> {
        song.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "title".to_string(),
            message: msg,
        })?;

        let now = Self::now();
        let result = sqlx::query(
            r#"
            INSERT INTO songs (
                title, artist,
                youtube_url, youtube_id, spotify_url, spotify_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.youtube_url)
        .bind(&song.youtube_id)
        .bind(&song.spotify_url)
        .bind(&song.spotify_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(song_id = id, "Inserted song");

        self.fetch(id).await
    }

    async fn update(&self, song: &Song) -> Result<Song> {
        song.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "title".to_string(),
            message: msg,
        })?;

        let result = sqlx::query(
            r#"
            UPDATE songs SET
                title = ?, artist = ?,
                youtube_url = ?, youtube_id = ?, spotify_url = ?, spotify_id = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.youtube_url)
        .bind(&song.youtube_id)
        .bind(&song.spotify_url)
        .bind(&song.spotify_id)
        .bind(Self::now())
        .bind(song.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound {
                entity_type: "Song".to_string(),
                id: song.id.to_string(),
            });
        }

        debug!(song_id = song.id, "Updated song");
        self.fetch(song.id).await
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
