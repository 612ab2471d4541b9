//! Multi-podcast upload from a single multipart form.
//!
//! The form groups its fields by podcast record id: `{id}_title`,
//! `{id}_description`, `{id}_file`, `{id}_public` and the inclusion marker
//! `{id}_post`. The whole form is read and every included group validated
//! before the first episode is posted, so a bad file or a foreign podcast
//! rejects the batch without side effects. Failures from the host after
//! publishing started cannot be undone; they stop the batch and the error
//! names what was already published.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use time::OffsetDateTime;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::dto::PublishedEpisode;
use super::manager::ManagerCache;
use super::model::Podcast;
use super::repository::PodcastRepository;
use crate::common::error::{AppError, AppResult};
use crate::common::upload::{has_audio_suffix, stream_to_staging, StagedUpload};
use crate::infrastructure::podcast_host::EpisodeDraft;
use crate::state::AppState;

pub const DEFAULT_EPISODE_TITLE: &str = "Untitled Episode";
pub const FILETYPE_ERROR: &str = "Filetype must be .mp3";

#[derive(Debug)]
pub enum FilePart {
    None,
    Staged(StagedUpload),
    /// Wrong extension; nothing was written to disk
    Rejected { file_name: String },
}

impl FilePart {
    async fn discard(self) {
        if let FilePart::Staged(staged) = self {
            staged.discard().await;
        }
    }
}

#[derive(Debug)]
pub struct BatchGroup {
    pub podcast_id: i64,
    pub title: String,
    pub description: String,
    pub file: FilePart,
    pub post: bool,
    pub public: bool,
}

impl BatchGroup {
    fn new(podcast_id: i64) -> Self {
        Self {
            podcast_id,
            title: String::new(),
            description: String::new(),
            file: FilePart::None,
            post: false,
            public: false,
        }
    }

    pub fn episode_title(&self) -> &str {
        if self.title.is_empty() {
            DEFAULT_EPISODE_TITLE
        } else {
            &self.title
        }
    }
}

/// Split `{id}_{suffix}`. Names without an underscore or a numeric id are not part of any group.
pub fn group_key(field_name: &str) -> Option<(i64, &str)> {
    let (prefix, suffix) = field_name.split_once('_')?;
    let id = prefix.parse::<i64>().ok()?;
    Some((id, suffix))
}

/// All groups of one submission, in the order their first field appeared.
#[derive(Debug, Default)]
pub struct BatchForm {
    groups: Vec<BatchGroup>,
}

impl BatchForm {
    pub fn groups(&self) -> &[BatchGroup] {
        &self.groups
    }

    fn group_mut(&mut self, podcast_id: i64) -> &mut BatchGroup {
        let index = match self.groups.iter().position(|g| g.podcast_id == podcast_id) {
            Some(index) => index,
            None => {
                self.groups.push(BatchGroup::new(podcast_id));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Record a text field. Unknown suffixes still register the group.
    pub fn push_text(&mut self, field_name: &str, value: String) {
        let Some((podcast_id, suffix)) = group_key(field_name) else {
            return;
        };

        let group = self.group_mut(podcast_id);
        match suffix {
            "title" => group.title = value,
            "description" => group.description = value,
            "post" => group.post = true,
            "public" => group.public = true,
            _ => {}
        }
    }

    /// Attach a file to its group; returns the part it replaced, if any.
    pub fn push_file(&mut self, podcast_id: i64, file: FilePart) -> FilePart {
        std::mem::replace(&mut self.group_mut(podcast_id).file, file)
    }

    /// Read the whole multipart body, staging accepted audio files.
    pub async fn read(multipart: &mut Multipart, state: &AppState) -> AppResult<Self> {
        let mut form = BatchForm::default();

        if let Err(e) = form.read_fields(multipart, state).await {
            form.discard().await;
            return Err(e);
        }

        Ok(form)
    }

    async fn read_fields(&mut self, multipart: &mut Multipart, state: &AppState) -> AppResult<()> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await.map_err(multipart_error)?;
                self.push_text(&name, value);
                continue;
            };

            let Some((podcast_id, "file")) = group_key(&name) else {
                continue;
            };

            let part = if file_name.is_empty() {
                FilePart::None
            } else if has_audio_suffix(&file_name) {
                let staged = stream_to_staging(&state.storage, field)
                    .await
                    .map_err(|e| match e.downcast::<MultipartError>() {
                        Ok(e) => multipart_error(e),
                        Err(e) => AppError::Internal(e),
                    })?;
                FilePart::Staged(staged)
            } else {
                FilePart::Rejected { file_name }
            };

            self.push_file(podcast_id, part).discard().await;
        }

        Ok(())
    }

    async fn discard(self) {
        discard_groups(self.groups).await;
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Malformed upload form: {}", e.body_text()))
    }
}

async fn discard_groups(groups: impl IntoIterator<Item = BatchGroup>) {
    for group in groups {
        group.file.discard().await;
    }
}

/// Where uploaded files are reachable from outside: the configured base, or the request's own host.
pub fn resolve_base_url(configured: Option<&Url>, host_header: Option<&str>) -> AppResult<Url> {
    if let Some(url) = configured {
        return Ok(url.clone());
    }

    let host = host_header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::Validation("Missing Host header".to_string()))?;

    Url::parse(&format!("http://{}/", host))
        .map_err(|_| AppError::Validation(format!("Invalid Host header '{}'", host)))
}

/// `{base}files/{name}`; `base` must end with a slash.
pub fn public_file_url(base: &Url, file_name: &str) -> Result<Url, url::ParseError> {
    base.join(&format!("files/{}", file_name))
}

pub struct BatchPublisher;

impl BatchPublisher {
    pub async fn publish(
        state: &AppState,
        user_id: Uuid,
        form: BatchForm,
        base_url: &Url,
    ) -> AppResult<Vec<PublishedEpisode>> {
        let (included, excluded): (Vec<_>, Vec<_>) = form.groups.into_iter().partition(|g| g.post);
        discard_groups(excluded).await;

        let validated = Self::validate(state, user_id, included).await?;

        let mut published = Vec::with_capacity(validated.len());
        let mut pending = validated.into_iter();

        while let Some((group, podcast)) = pending.next() {
            match Self::publish_one(state, user_id, &podcast, group, base_url).await {
                Ok(entry) => published.push(entry),
                Err(e) => {
                    discard_groups(pending.map(|(group, _)| group)).await;
                    return Err(Self::partial_failure(e, &published));
                }
            }
        }

        info!("Batch upload by {} published {} episode(s)", user_id, published.len());
        Ok(published)
    }

    /// Resolve and check every included group; on the first failure all staged files are dropped.
    async fn validate(
        state: &AppState,
        user_id: Uuid,
        included: Vec<BatchGroup>,
    ) -> AppResult<Vec<(BatchGroup, Podcast)>> {
        let mut validated: Vec<(BatchGroup, Podcast)> = Vec::with_capacity(included.len());
        let mut remaining = included.into_iter();

        while let Some(group) = remaining.next() {
            match Self::check_group(state, user_id, &group).await {
                Ok(podcast) => validated.push((group, podcast)),
                Err(e) => {
                    group.file.discard().await;
                    discard_groups(remaining).await;
                    discard_groups(validated.into_iter().map(|(group, _)| group)).await;
                    return Err(e);
                }
            }
        }

        Ok(validated)
    }

    async fn check_group(state: &AppState, user_id: Uuid, group: &BatchGroup) -> AppResult<Podcast> {
        let podcast = PodcastRepository::find_by_id(&state.db, group.podcast_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Podcast with ID {} doesn't exist", group.podcast_id))
            })?;

        if podcast.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        if let FilePart::Rejected { file_name } = &group.file {
            warn!("Rejected upload '{}' for podcast {}", file_name, podcast.id);
            return Err(AppError::Validation(FILETYPE_ERROR.to_string()));
        }

        Ok(podcast)
    }

    async fn publish_one(
        state: &AppState,
        user_id: Uuid,
        podcast: &Podcast,
        group: BatchGroup,
        base_url: &Url,
    ) -> AppResult<PublishedEpisode> {
        let title = group.episode_title().to_string();

        let audio_url = match group.file {
            FilePart::Staged(staged) => {
                let now = OffsetDateTime::now_utc().unix_timestamp();
                let name = staged.promote_audio(&state.storage, user_id, podcast.id, now).await?;
                let url = public_file_url(base_url, &name)
                    .map_err(|e| anyhow::anyhow!("Failed to build file URL: {}", e))?;
                Some(url.to_string())
            }
            FilePart::None => None,
            FilePart::Rejected { .. } => return Err(AppError::Validation(FILETYPE_ERROR.to_string())),
        };

        let draft = EpisodeDraft {
            title,
            description: group.description,
            audio_url: audio_url.clone(),
        };

        let mut manager = ManagerCache::get_manager(&state.db, podcast.credentials()).await;
        let posted = manager.post_episode(state.host.as_ref(), &draft).await;

        let result = match posted {
            Ok(episode) if group.public => manager.set_episode_public(state.host.as_ref(), episode.id).await,
            other => other,
        };

        // Keep whatever the host accepted, even if a later step failed.
        ManagerCache::update_manager(&state.db, &manager).await?;
        let episode = result?;

        Ok(PublishedEpisode {
            podcast_id: podcast.id,
            podcast_name: podcast.podcast_name.clone(),
            episode,
            audio_url,
        })
    }

    fn partial_failure(error: AppError, published: &[PublishedEpisode]) -> AppError {
        if published.is_empty() {
            return error;
        }

        let names = published
            .iter()
            .map(|p| p.podcast_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        warn!("Batch upload stopped after publishing to: {}", names);

        AppError::PartiallyPublished {
            status: error.status(),
            message: error.public_message(),
            published: names,
        }
    }
}
