//! Per-account manager and its snapshot cache.
//!
//! A [`ManagerHandle`] wraps one account's credentials together with the
//! episode list last fetched from the podcast host. Between requests the
//! handle lives in `podcasts.manager_blob` as a versioned JSON
//! [`ManagerSnapshot`]. Loading never fails: anything unusable in the
//! store degrades to a fresh handle that fetches on first use.
//!
//! There is no locking around the blob. Two requests for the same account
//! read, mutate and write independently and the last write wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::repository::PodcastRepository;
use crate::common::error::AppResult;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::podcast_host::{
    Credentials, Episode, EpisodeChanges, EpisodeDraft, HostError, PodcastHost,
};

/// Bump whenever [`ManagerSnapshot`] changes shape.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The stored form of a handle. Credentials are not part of it: the token
/// always comes from the row being served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub version: u32,
    pub account_id: String,
    pub episodes: Vec<Episode>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub fetched_at: Option<OffsetDateTime>,
}

/// Why a stored snapshot could not be used
#[derive(Error, Debug)]
pub enum CacheMiss {
    #[error("no snapshot stored")]
    Absent,

    #[error("snapshot is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("snapshot version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("snapshot belongs to account {found}")]
    AccountMismatch { found: String },

    #[error("snapshot lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerHandle {
    credentials: Credentials,
    episodes: Vec<Episode>,
    fetched_at: Option<OffsetDateTime>,
}

impl ManagerHandle {
    /// A handle that has not talked to the host yet.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            episodes: Vec::new(),
            fetched_at: None,
        }
    }

    pub fn from_snapshot(snapshot: ManagerSnapshot, credentials: Credentials) -> Result<Self, CacheMiss> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheMiss::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.account_id != credentials.account_id {
            return Err(CacheMiss::AccountMismatch {
                found: snapshot.account_id,
            });
        }

        Ok(Self {
            credentials,
            episodes: snapshot.episodes,
            fetched_at: snapshot.fetched_at,
        })
    }

    pub fn from_blob(blob: &str, credentials: Credentials) -> Result<Self, CacheMiss> {
        let snapshot: ManagerSnapshot = serde_json::from_str(blob)?;
        Self::from_snapshot(snapshot, credentials)
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            version: SNAPSHOT_VERSION,
            account_id: self.credentials.account_id.clone(),
            episodes: self.episodes.clone(),
            fetched_at: self.fetched_at,
        }
    }

    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    pub fn account_id(&self) -> &str {
        &self.credentials.account_id
    }

    /// Whatever is cached, without contacting the host.
    pub fn cached_episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn fetched_at(&self) -> Option<OffsetDateTime> {
        self.fetched_at
    }

    pub fn is_stale(&self, ttl: Duration, now: OffsetDateTime) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at >= ttl,
            None => true,
        }
    }

    /// Replace the cached list with the host's current one.
    pub async fn refresh(&mut self, host: &dyn PodcastHost) -> Result<(), HostError> {
        self.episodes = host.list_episodes(&self.credentials).await?;
        self.fetched_at = Some(OffsetDateTime::now_utc());

        debug!(
            "Refreshed {} episodes for account {}",
            self.episodes.len(),
            self.credentials.account_id
        );
        Ok(())
    }

    /// The episode list, refetched first when older than `ttl`.
    pub async fn list_episodes(
        &mut self,
        host: &dyn PodcastHost,
        ttl: Duration,
    ) -> Result<&[Episode], HostError> {
        if self.is_stale(ttl, OffsetDateTime::now_utc()) {
            self.refresh(host).await?;
        }
        Ok(&self.episodes)
    }

    /// Cached copy when present, otherwise fetched and merged into the cache.
    pub async fn episode_by_id(&mut self, host: &dyn PodcastHost, id: i64) -> Result<Episode, HostError> {
        if let Some(episode) = self.episodes.iter().find(|e| e.id == id) {
            return Ok(episode.clone());
        }

        let episode = host.get_episode(&self.credentials, id).await?;
        self.upsert(episode.clone());
        Ok(episode)
    }

    pub async fn post_episode(
        &mut self,
        host: &dyn PodcastHost,
        draft: &EpisodeDraft,
    ) -> Result<Episode, HostError> {
        let episode = host.create_episode(&self.credentials, draft).await?;
        self.episodes.insert(0, episode.clone());

        info!(
            "Posted episode {} '{}' to account {}",
            episode.id, episode.title, self.credentials.account_id
        );
        Ok(episode)
    }

    pub async fn update_episode(
        &mut self,
        host: &dyn PodcastHost,
        id: i64,
        changes: &EpisodeChanges,
    ) -> Result<Episode, HostError> {
        let episode = host.update_episode(&self.credentials, id, changes).await?;
        self.upsert(episode.clone());
        Ok(episode)
    }

    pub async fn set_episode_public(&mut self, host: &dyn PodcastHost, id: i64) -> Result<Episode, HostError> {
        let episode = host.set_public(&self.credentials, id).await?;
        self.upsert(episode.clone());
        Ok(episode)
    }

    pub async fn set_episode_private(&mut self, host: &dyn PodcastHost, id: i64) -> Result<Episode, HostError> {
        let episode = host.set_private(&self.credentials, id).await?;
        self.upsert(episode.clone());
        Ok(episode)
    }

    fn upsert(&mut self, episode: Episode) {
        match self.episodes.iter_mut().find(|e| e.id == episode.id) {
            Some(existing) => *existing = episode,
            None => self.episodes.insert(0, episode),
        }
    }
}

pub struct ManagerCache;

impl ManagerCache {
    /// Load the cached handle for `credentials.account_id`, or start fresh.
    pub async fn get_manager(pool: &DbPool, credentials: Credentials) -> ManagerHandle {
        match Self::load(pool, &credentials).await {
            Ok(handle) => handle,
            Err(CacheMiss::Absent) => {
                debug!("No cached manager for account {}", credentials.account_id);
                ManagerHandle::new(credentials)
            }
            Err(miss) => {
                warn!(
                    "Discarding cached manager for account {}: {}",
                    credentials.account_id, miss
                );
                ManagerHandle::new(credentials)
            }
        }
    }

    async fn load(pool: &DbPool, credentials: &Credentials) -> Result<ManagerHandle, CacheMiss> {
        let blob = PodcastRepository::find_blob_by_account(pool, &credentials.account_id)
            .await?
            .ok_or(CacheMiss::Absent)?;

        ManagerHandle::from_blob(&blob, credentials.clone())
    }

    /// Write the handle back to every row for its account.
    pub async fn update_manager(pool: &DbPool, handle: &ManagerHandle) -> AppResult<()> {
        let blob = handle
            .to_blob()
            .map_err(|e| anyhow::anyhow!("Failed to serialize manager: {}", e))?;

        let rows = PodcastRepository::store_blob_for_account(pool, handle.account_id(), &blob).await?;
        debug!(
            "Stored manager snapshot for account {} on {} row(s)",
            handle.account_id(),
            rows
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::podcast_host::InMemoryHost;

    fn creds() -> Credentials {
        Credentials::new("1734313", "token")
    }

    fn episode(id: i64, title: &str) -> Episode {
        Episode {
            id,
            title: title.to_string(),
            description: None,
            audio_url: None,
            artwork_url: None,
            published_at: None,
            duration: None,
            total_plays: None,
            private: true,
        }
    }

    fn draft(title: &str) -> EpisodeDraft {
        EpisodeDraft {
            title: title.to_string(),
            description: String::new(),
            audio_url: None,
        }
    }

    #[test]
    fn blob_round_trips_to_an_equal_handle() {
        let mut handle = ManagerHandle::new(creds());
        handle.episodes = vec![episode(2, "two"), episode(1, "one")];
        handle.fetched_at = Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());

        let blob = handle.to_blob().unwrap();
        let restored = ManagerHandle::from_blob(&blob, creds()).unwrap();

        assert_eq!(restored, handle);
    }

    #[test]
    fn corrupt_blob_is_a_miss() {
        let err = ManagerHandle::from_blob("\u{80}pickle", creds()).unwrap_err();
        assert!(matches!(err, CacheMiss::Corrupt(_)));
    }

    #[test]
    fn other_version_is_a_miss() {
        let mut snapshot = ManagerHandle::new(creds()).snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;

        let err = ManagerHandle::from_snapshot(snapshot, creds()).unwrap_err();
        assert!(matches!(err, CacheMiss::VersionMismatch { .. }));
    }

    #[test]
    fn snapshot_for_another_account_is_a_miss() {
        let snapshot = ManagerHandle::new(Credentials::new("999", "x")).snapshot();

        let err = ManagerHandle::from_snapshot(snapshot, creds()).unwrap_err();
        assert!(matches!(err, CacheMiss::AccountMismatch { .. }));
    }

    #[test]
    fn staleness_follows_ttl() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let mut handle = ManagerHandle::new(creds());
        assert!(handle.is_stale(Duration::seconds(300), now));

        handle.fetched_at = Some(now - Duration::seconds(10));
        assert!(!handle.is_stale(Duration::seconds(300), now));
        assert!(handle.is_stale(Duration::seconds(10), now));
        assert!(handle.is_stale(Duration::ZERO, now));
    }

    #[tokio::test]
    async fn fresh_listing_is_served_from_cache() {
        let host = InMemoryHost::new().with_account("1734313", "token");
        let mut handle = ManagerHandle::new(creds());

        handle.list_episodes(&host, Duration::seconds(300)).await.unwrap();
        handle.list_episodes(&host, Duration::seconds(300)).await.unwrap();
        assert_eq!(host.list_calls(), 1);

        handle.list_episodes(&host, Duration::ZERO).await.unwrap();
        assert_eq!(host.list_calls(), 2);
    }

    #[tokio::test]
    async fn posted_episode_is_cached_first() {
        let host = InMemoryHost::new().with_account("1734313", "token");
        let mut handle = ManagerHandle::new(creds());

        let first = handle.post_episode(&host, &draft("first")).await.unwrap();
        let second = handle.post_episode(&host, &draft("second")).await.unwrap();

        let ids: Vec<i64> = handle.cached_episodes().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn public_then_private_ends_private() {
        let host = InMemoryHost::new().with_account("1734313", "token");
        let mut handle = ManagerHandle::new(creds());
        let created = handle.post_episode(&host, &draft("toggle")).await.unwrap();

        handle.set_episode_public(&host, created.id).await.unwrap();
        assert!(!handle.episode_by_id(&host, created.id).await.unwrap().private);

        handle.set_episode_private(&host, created.id).await.unwrap();
        assert!(handle.episode_by_id(&host, created.id).await.unwrap().private);
        assert!(host.episodes("1734313")[0].private);
    }

    #[tokio::test]
    async fn unknown_episode_is_fetched_and_merged() {
        let host = InMemoryHost::new().with_account("1734313", "token");
        let created = host.create_episode(&creds(), &draft("elsewhere")).await.unwrap();

        let mut handle = ManagerHandle::new(creds());
        assert!(handle.cached_episodes().is_empty());

        let fetched = handle.episode_by_id(&host, created.id).await.unwrap();
        assert_eq!(fetched.title, "elsewhere");
        assert_eq!(handle.cached_episodes().len(), 1);
    }
}
