//! Client side of the external podcast-hosting API.
//!
//! The console never talks HTTP to the host directly; everything goes
//! through [`PodcastHost`] so the manager and the batch publisher can run
//! against either the real Buzzsprout API or the in-memory host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub mod buzzsprout;
pub mod memory;

pub use buzzsprout::BuzzsproutClient;
pub use memory::InMemoryHost;

/// Account ID and API token for one hosted podcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            token: token.into(),
        }
    }
}

/// An episode as the host reports it. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Episode {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub total_plays: Option<i64>,
    #[serde(default)]
    pub private: bool,
}

/// Fields sent to create an episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Partial update; `None` fields are left untouched on the host
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

impl EpisodeChanges {
    pub fn visibility(private: bool) -> Self {
        Self {
            private: Some(private),
            ..Self::default()
        }
    }
}

/// Errors that can occur when calling the podcast host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Podcast host request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Podcast host returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Podcast host rejected the credentials for account {account_id}")]
    InvalidCredentials { account_id: String },

    #[error("Episode {id} not found on podcast host")]
    EpisodeNotFound { id: i64 },

    #[error("Invalid podcast host URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Operations the console needs from a podcast host.
///
/// Calls are awaited one at a time by the callers; no implementation is
/// expected to retry.
#[async_trait]
pub trait PodcastHost: Send + Sync {
    /// `Ok(false)` means the host answered and refused the pair.
    async fn validate_credentials(&self, credentials: &Credentials) -> Result<bool, HostError>;

    /// Newest first.
    async fn list_episodes(&self, credentials: &Credentials) -> Result<Vec<Episode>, HostError>;

    async fn get_episode(&self, credentials: &Credentials, id: i64) -> Result<Episode, HostError>;

    async fn create_episode(
        &self,
        credentials: &Credentials,
        draft: &EpisodeDraft,
    ) -> Result<Episode, HostError>;

    async fn update_episode(
        &self,
        credentials: &Credentials,
        id: i64,
        changes: &EpisodeChanges,
    ) -> Result<Episode, HostError>;

    async fn set_public(&self, credentials: &Credentials, id: i64) -> Result<Episode, HostError> {
        self.update_episode(credentials, id, &EpisodeChanges::visibility(false))
            .await
    }

    async fn set_private(&self, credentials: &Credentials, id: i64) -> Result<Episode, HostError> {
        self.update_episode(credentials, id, &EpisodeChanges::visibility(true))
            .await
    }
}
