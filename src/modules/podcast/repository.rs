use super::model::Podcast;
use anyhow::{anyhow, Result};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

const PODCAST_COLUMNS: &str =
    "id, podcast_id, token, podcast_name, user_id, manager_blob, created_at, updated_at";

pub struct PodcastRepository;

impl PodcastRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        podcast_name: &str,
        podcast_id: &str,
        token: &str,
    ) -> Result<Podcast> {
        let now = OffsetDateTime::now_utc();

        let podcast = sqlx::query_as::<_, Podcast>(&format!(
            r#"
            INSERT INTO podcasts (podcast_id, token, podcast_name, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            PODCAST_COLUMNS
        ))
        .bind(podcast_id)
        .bind(token)
        .bind(podcast_name)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| anyhow!("Failed to create podcast: {}", e))?;

        Ok(podcast)
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Podcast>> {
        let podcasts = sqlx::query_as::<_, Podcast>(&format!(
            "SELECT {} FROM podcasts WHERE user_id = ? ORDER BY id ASC",
            PODCAST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(|e| anyhow!("Failed to fetch podcasts: {}", e))?;

        Ok(podcasts)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Podcast>> {
        let podcast = sqlx::query_as::<_, Podcast>(&format!(
            "SELECT {} FROM podcasts WHERE id = ?",
            PODCAST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| anyhow!("Failed to fetch podcast: {}", e))?;

        Ok(podcast)
    }

    /// New credentials invalidate whatever was cached for the old ones.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        podcast_name: &str,
        podcast_id: &str,
        token: &str,
    ) -> Result<Podcast> {
        let podcast = sqlx::query_as::<_, Podcast>(&format!(
            r#"
            UPDATE podcasts
            SET
                podcast_name = ?,
                podcast_id = ?,
                token = ?,
                manager_blob = NULL,
                updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            PODCAST_COLUMNS
        ))
        .bind(podcast_name)
        .bind(podcast_id)
        .bind(token)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| anyhow!("Failed to update podcast: {}", e))?
        .ok_or_else(|| anyhow!("Podcast not found"))?;

        Ok(podcast)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM podcasts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Podcast not found"));
        }

        Ok(())
    }

    /// Cached snapshot of the first row registered for `account_id`.
    ///
    /// `Ok(None)` covers both "no such row" and "row without a snapshot".
    pub async fn find_blob_by_account(pool: &SqlitePool, account_id: &str) -> Result<Option<String>, sqlx::Error> {
        let blob: Option<Option<String>> = sqlx::query_scalar(
            "SELECT manager_blob FROM podcasts WHERE podcast_id = ? ORDER BY id ASC LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(blob.flatten())
    }

    /// Writes the snapshot to every row for the account. Returns rows touched.
    pub async fn store_blob_for_account(
        pool: &SqlitePool,
        account_id: &str,
        blob: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE podcasts SET manager_blob = ? WHERE podcast_id = ?")
            .bind(blob)
            .bind(account_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
