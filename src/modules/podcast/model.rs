use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::infrastructure::podcast_host::Credentials;

/// One registered podcast account, owned by a console user.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Podcast {
    pub id: i64,
    /// External account ID on the podcast host
    pub podcast_id: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub podcast_name: String,
    pub user_id: Uuid,
    /// Serialized manager snapshot, see `manager::ManagerSnapshot`
    #[serde(skip_serializing)]
    pub manager_blob: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Podcast {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.podcast_id.clone(), self.token.clone())
    }
}
