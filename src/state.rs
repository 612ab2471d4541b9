use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::podcast_host::PodcastHost;
use crate::infrastructure::storage::local::UploadStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub host: Arc<dyn PodcastHost>,
    pub storage: UploadStorage,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        host: Arc<dyn PodcastHost>,
        storage: UploadStorage,
    ) -> Self {
        Self {
            config,
            db,
            host,
            storage,
        }
    }

    pub fn cache_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.config.manager_cache_ttl_secs.min(i64::MAX as u64) as i64)
    }
}
