use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    DbMaxConnections,
    JwtSecret,
    SessionTtlSecs,
    UploadFolder,
    PublicBaseUrl,
    PodcastHost,
    BuzzsproutApiUrl,
    ManagerCacheTtlSecs,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::DbMaxConnections => "DB_MAX_CONNECTIONS",
            EnvKey::JwtSecret => "JWT_SECRET",
            EnvKey::SessionTtlSecs => "SESSION_TTL_SECS",
            EnvKey::UploadFolder => "UPLOAD_FOLDER",
            EnvKey::PublicBaseUrl => "PUBLIC_BASE_URL",
            EnvKey::PodcastHost => "PODCAST_HOST",
            EnvKey::BuzzsproutApiUrl => "BUZZSPROUT_API_URL",
            EnvKey::ManagerCacheTtlSecs => "MANAGER_CACHE_TTL_SECS",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Like [`get_parsed`] but without a fallback: unset, blank or unparsable values are `None`.
pub fn get_optional<T: FromStr>(key: EnvKey) -> Option<T> {
    get(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .and_then(|val| val.trim().parse::<T>().ok())
}
