use super::batch::{BatchForm, BatchPublisher};
use super::dto::{
    EpisodeEditForm, PodcastDetailsResponse, PodcastForm, PodcastResponse, PublishedEpisode,
};
use super::manager::ManagerCache;
use super::model::Podcast;
use super::repository::PodcastRepository;
use crate::common::error::{AppError, AppResult};
use crate::infrastructure::podcast_host::{Credentials, Episode, EpisodeChanges};
use crate::state::AppState;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// How many episodes the details view shows.
pub const DETAILS_EPISODE_LIMIT: usize = 20;

pub const INVALID_CREDENTIALS: &str = "No Buzzsprout Account with given ID and Token";

pub struct PodcastService;

impl PodcastService {
    pub async fn list(state: AppState, user_id: Uuid) -> AppResult<Vec<PodcastResponse>> {
        let podcasts = PodcastRepository::find_by_user(&state.db, user_id).await?;
        Ok(podcasts.into_iter().map(PodcastResponse::from).collect())
    }

    /// The record behind `/{id}/...`: 404 when unknown, 403 when it belongs to someone else.
    pub async fn get_owned(state: &AppState, user_id: Uuid, id: i64) -> AppResult<Podcast> {
        let podcast = PodcastRepository::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Podcast with ID {} doesn't exist", id)))?;

        if podcast.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        Ok(podcast)
    }

    async fn check_credentials(state: &AppState, form: &PodcastForm) -> AppResult<()> {
        form.check()?;

        let credentials = Credentials::new(form.podcast_id.clone(), form.token.clone());
        if !state.host.validate_credentials(&credentials).await? {
            return Err(AppError::Validation(INVALID_CREDENTIALS.to_string()));
        }

        Ok(())
    }

    pub async fn create(state: AppState, user_id: Uuid, form: PodcastForm) -> AppResult<PodcastResponse> {
        Self::check_credentials(&state, &form).await?;

        let podcast = PodcastRepository::create(
            &state.db,
            user_id,
            &form.podcast_name,
            &form.podcast_id,
            &form.token,
        )
        .await?;

        info!("User {} added podcast {} ({})", user_id, podcast.podcast_name, podcast.id);
        Ok(podcast.into())
    }

    pub async fn update(state: AppState, podcast: Podcast, form: PodcastForm) -> AppResult<PodcastResponse> {
        Self::check_credentials(&state, &form).await?;

        let podcast = PodcastRepository::update(
            &state.db,
            podcast.id,
            &form.podcast_name,
            &form.podcast_id,
            &form.token,
        )
        .await?;

        Ok(podcast.into())
    }

    pub async fn delete(state: AppState, podcast: Podcast) -> AppResult<()> {
        PodcastRepository::delete(&state.db, podcast.id).await?;
        info!("Deleted podcast {} ({})", podcast.podcast_name, podcast.id);
        Ok(())
    }

    /// The podcast and its newest episodes. `refresh` skips the cache.
    pub async fn details(state: AppState, podcast: Podcast, refresh: bool) -> AppResult<PodcastDetailsResponse> {
        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;

        let episodes = if refresh {
            manager.refresh(state.host.as_ref()).await?;
            manager.cached_episodes()
        } else {
            manager.list_episodes(state.host.as_ref(), state.cache_ttl()).await?
        };
        let episodes: Vec<Episode> = episodes.iter().take(DETAILS_EPISODE_LIMIT).cloned().collect();

        ManagerCache::update_manager(&state.db, &manager).await?;

        Ok(PodcastDetailsResponse {
            podcast: podcast.into(),
            episodes,
            fetched_at: manager.fetched_at(),
        })
    }

    pub async fn episode(state: AppState, podcast: Podcast, episode_id: i64) -> AppResult<Episode> {
        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;
        let episode = manager.episode_by_id(state.host.as_ref(), episode_id).await?;

        ManagerCache::update_manager(&state.db, &manager).await?;
        Ok(episode)
    }

    pub async fn set_visibility(
        state: AppState,
        podcast: Podcast,
        episode_id: i64,
        public: bool,
    ) -> AppResult<Episode> {
        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;

        let episode = if public {
            manager.set_episode_public(state.host.as_ref(), episode_id).await?
        } else {
            manager.set_episode_private(state.host.as_ref(), episode_id).await?
        };

        ManagerCache::update_manager(&state.db, &manager).await?;

        info!(
            "Episode {} of podcast {} is now {}",
            episode_id,
            podcast.id,
            if episode.private { "private" } else { "public" }
        );
        Ok(episode)
    }

    /// The episode as the host has it right now, for the edit form.
    pub async fn edit_view(state: AppState, podcast: Podcast, episode_id: i64) -> AppResult<Episode> {
        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;
        manager.refresh(state.host.as_ref()).await?;
        let episode = manager.episode_by_id(state.host.as_ref(), episode_id).await?;

        ManagerCache::update_manager(&state.db, &manager).await?;
        Ok(episode)
    }

    pub async fn edit_episode(
        state: AppState,
        podcast: Podcast,
        episode_id: i64,
        form: EpisodeEditForm,
    ) -> AppResult<Episode> {
        let changes = EpisodeChanges {
            title: Some(form.title),
            description: Some(form.description),
            private: Some(form.not_private.is_none()),
        };

        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;
        let episode = manager
            .update_episode(state.host.as_ref(), episode_id, &changes)
            .await?;

        ManagerCache::update_manager(&state.db, &manager).await?;
        Ok(episode)
    }

    pub async fn batch_upload(
        state: AppState,
        user_id: Uuid,
        form: BatchForm,
        base_url: Url,
    ) -> AppResult<Vec<PublishedEpisode>> {
        BatchPublisher::publish(&state, user_id, form, &base_url).await
    }
}
