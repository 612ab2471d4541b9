use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use validator::Validate;

use super::model::Podcast;
use crate::common::error::{validation_error, AppError};
use crate::infrastructure::podcast_host::Episode;

pub const PODCAST_FORM_FIELDS: [&str; 3] = ["podcast_name", "podcast_id", "token"];

/// Create/update form for a podcast account
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct PodcastForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "A Name is required"))]
    pub podcast_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "An ID is required"))]
    pub podcast_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "A token is required"))]
    pub token: String,
}

impl PodcastForm {
    /// Field checks in form order; the first failure is the one reported.
    pub fn check(&self) -> Result<(), AppError> {
        let errors = self.validate().err();
        let failed = |field: &str| {
            errors
                .as_ref()
                .is_some_and(|e| e.field_errors().contains_key(field))
        };

        if let Some(e) = errors.as_ref().filter(|_| failed("podcast_name") || failed("podcast_id")) {
            return Err(validation_error(e, &PODCAST_FORM_FIELDS[..2]));
        }

        if !self.podcast_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation("Invalid ID".to_string()));
        }

        match errors {
            Some(e) => Err(validation_error(&e, &PODCAST_FORM_FIELDS)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PodcastResponse {
    pub id: i64,
    pub podcast_name: String,
    pub podcast_id: String,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Podcast> for PodcastResponse {
    fn from(p: Podcast) -> Self {
        Self {
            id: p.id,
            podcast_name: p.podcast_name,
            podcast_id: p.podcast_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PodcastDetailsResponse {
    pub podcast: PodcastResponse,
    pub episodes: Vec<Episode>,
    /// When the episode list was last fetched from the host
    #[schema(value_type = Option<String>, format = DateTime)]
    #[serde(with = "time::serde::rfc3339::option")]
    pub fetched_at: Option<OffsetDateTime>,
}

/// `public` present → make public, absent → make private
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PublishForm {
    pub public: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EpisodeEditForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Presence marker; the episode stays private unless it is sent
    pub not_private: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishedEpisode {
    pub podcast_id: i64,
    pub podcast_name: String,
    pub episode: Episode,
    /// Public URL handed to the host, if a file was uploaded
    pub audio_url: Option<String>,
}
