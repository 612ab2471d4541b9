use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::config::env::{self, EnvKey};

pub const DEFAULT_BUZZSPROUT_API_URL: &str = "https://www.buzzsprout.com/api/";

/// Which podcast host implementation backs the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostBackend {
    Buzzsprout,
    /// Offline host kept in process memory. Accepts any numeric account with any token.
    Memory,
}

impl FromStr for HostBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buzzsprout" => Ok(HostBackend::Buzzsprout),
            "memory" => Ok(HostBackend::Memory),
            other => Err(format!("unknown podcast host backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub upload_folder: PathBuf,
    /// Base used for the audio URLs handed to the podcast host. Falls back to the request's Host header.
    pub public_base_url: Option<Url>,
    pub podcast_host: HostBackend,
    pub buzzsprout_api_url: Url,
    pub manager_cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let buzzsprout_api_url = env::get_optional(EnvKey::BuzzsproutApiUrl)
            .unwrap_or_else(default_buzzsprout_url);

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get_or(EnvKey::DatabaseUrl, "sqlite://podcast_console.db"),
            db_max_connections: env::get_parsed(EnvKey::DbMaxConnections, 5),
            jwt_secret: env::get(EnvKey::JwtSecret)?,
            session_ttl_secs: env::get_parsed(EnvKey::SessionTtlSecs, 24 * 60 * 60),
            upload_folder: PathBuf::from(env::get_or(EnvKey::UploadFolder, "uploads")),
            public_base_url: env::get_optional(EnvKey::PublicBaseUrl).map(with_trailing_slash),
            podcast_host: env::get_parsed(EnvKey::PodcastHost, HostBackend::Buzzsprout),
            buzzsprout_api_url: with_trailing_slash(buzzsprout_api_url),
            manager_cache_ttl_secs: env::get_parsed(EnvKey::ManagerCacheTtlSecs, 300),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 512 * 1024 * 1024),
        })
    }
}

fn default_buzzsprout_url() -> Url {
    Url::parse(DEFAULT_BUZZSPROUT_API_URL).expect("default Buzzsprout URL is valid")
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
