use async_trait::async_trait;
use reqwest::{header, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::{Credentials, Episode, EpisodeChanges, EpisodeDraft, HostError, PodcastHost};

/// Buzzsprout REST client: `{base}/{account_id}/episodes.json` and friends.
#[derive(Clone)]
pub struct BuzzsproutClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BuzzsproutClient {
    /// `base_url` must end with a slash, e.g. `https://www.buzzsprout.com/api/`.
    pub fn new(base_url: Url) -> Self {
        info!("Podcast host: Buzzsprout at {}", base_url);
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn episodes_url(&self, account_id: &str) -> Result<Url, HostError> {
        Ok(self.base_url.join(&format!("{}/episodes.json", account_id))?)
    }

    fn episode_url(&self, account_id: &str, id: i64) -> Result<Url, HostError> {
        Ok(self
            .base_url
            .join(&format!("{}/episodes/{}.json", account_id, id))?)
    }

    fn authorized(builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        builder.header(header::AUTHORIZATION, auth_header_value(&credentials.token))
    }

    async fn send(builder: RequestBuilder, url: &Url) -> Result<Response, HostError> {
        builder.send().await.map_err(|source| HostError::RequestFailed {
            url: url.to_string(),
            source,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, HostError> {
        response
            .json::<T>()
            .await
            .map_err(|source| HostError::RequestFailed {
                url: url.to_string(),
                source,
            })
    }

    fn check_status(
        response: &Response,
        url: &Url,
        credentials: &Credentials,
        episode_id: Option<i64>,
    ) -> Result<(), HostError> {
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HostError::InvalidCredentials {
                account_id: credentials.account_id.clone(),
            }),
            StatusCode::NOT_FOUND if episode_id.is_some() => Err(HostError::EpisodeNotFound {
                id: episode_id.unwrap_or_default(),
            }),
            status => Err(HostError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Buzzsprout's token scheme, not a bearer token.
pub fn auth_header_value(token: &str) -> String {
    format!("Token token={}", token)
}

#[async_trait]
impl PodcastHost for BuzzsproutClient {
    async fn validate_credentials(&self, credentials: &Credentials) -> Result<bool, HostError> {
        let url = self.episodes_url(&credentials.account_id)?;
        let request = Self::authorized(self.client.get(url.clone()), credentials);
        let response = Self::send(request, &url).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!(
                    "Credentials for account {} rejected with {}",
                    credentials.account_id,
                    response.status()
                );
                Ok(false)
            }
            status => Err(HostError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn list_episodes(&self, credentials: &Credentials) -> Result<Vec<Episode>, HostError> {
        let url = self.episodes_url(&credentials.account_id)?;
        let request = Self::authorized(self.client.get(url.clone()), credentials);
        let response = Self::send(request, &url).await?;
        Self::check_status(&response, &url, credentials, None)?;

        Self::read_json(response, &url).await
    }

    async fn get_episode(&self, credentials: &Credentials, id: i64) -> Result<Episode, HostError> {
        let url = self.episode_url(&credentials.account_id, id)?;
        let request = Self::authorized(self.client.get(url.clone()), credentials);
        let response = Self::send(request, &url).await?;
        Self::check_status(&response, &url, credentials, Some(id))?;

        Self::read_json(response, &url).await
    }

    async fn create_episode(
        &self,
        credentials: &Credentials,
        draft: &EpisodeDraft,
    ) -> Result<Episode, HostError> {
        let url = self.episodes_url(&credentials.account_id)?;
        let request = Self::authorized(self.client.post(url.clone()).json(draft), credentials);
        let response = Self::send(request, &url).await?;
        Self::check_status(&response, &url, credentials, None)?;

        let episode: Episode = Self::read_json(response, &url).await?;
        info!(
            "Created episode {} on account {}",
            episode.id, credentials.account_id
        );
        Ok(episode)
    }

    async fn update_episode(
        &self,
        credentials: &Credentials,
        id: i64,
        changes: &EpisodeChanges,
    ) -> Result<Episode, HostError> {
        let url = self.episode_url(&credentials.account_id, id)?;
        let request = Self::authorized(self.client.put(url.clone()).json(changes), credentials);
        let response = Self::send(request, &url).await?;
        Self::check_status(&response, &url, credentials, Some(id))?;

        // The update answers without a usable body, so read the episode back.
        self.get_episode(credentials, id).await
    }
}
