use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{Credentials, Episode, EpisodeChanges, EpisodeDraft, HostError, PodcastHost};

#[derive(Debug, Default)]
struct Account {
    token: String,
    /// Newest first, like the real host.
    episodes: Vec<Episode>,
}

/// A podcast host living in process memory.
///
/// Accounts are either registered up front with [`InMemoryHost::with_account`]
/// or, in open mode, created on first successful credential check for any
/// numeric account ID.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    accounts: Mutex<HashMap<String, Account>>,
    open: bool,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    updates_unavailable: AtomicBool,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any numeric account with any token, registering it on first use.
    pub fn open() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    pub fn with_account(self, account_id: &str, token: &str) -> Self {
        self.lock().insert(
            account_id.to_string(),
            Account {
                token: token.to_string(),
                episodes: Vec::new(),
            },
        );
        self
    }

    /// Episodes currently stored for `account_id`, newest first.
    pub fn episodes(&self, account_id: &str) -> Vec<Episode> {
        self.lock()
            .get(account_id)
            .map(|account| account.episodes.clone())
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Answer every later episode update with HTTP 503, as an overloaded host would.
    pub fn fail_updates(&self) {
        self.updates_unavailable.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_authorized<T>(
        &self,
        credentials: &Credentials,
        f: impl FnOnce(&mut Account) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let mut accounts = self.lock();
        match accounts.get_mut(&credentials.account_id) {
            Some(account) if account.token == credentials.token => f(account),
            _ => Err(HostError::InvalidCredentials {
                account_id: credentials.account_id.clone(),
            }),
        }
    }
}

#[async_trait]
impl PodcastHost for InMemoryHost {
    async fn validate_credentials(&self, credentials: &Credentials) -> Result<bool, HostError> {
        let mut accounts = self.lock();
        if let Some(account) = accounts.get(&credentials.account_id) {
            return Ok(account.token == credentials.token);
        }

        let numeric = !credentials.account_id.is_empty()
            && credentials.account_id.chars().all(|c| c.is_ascii_digit());
        if self.open && numeric && !credentials.token.is_empty() {
            accounts.insert(
                credentials.account_id.clone(),
                Account {
                    token: credentials.token.clone(),
                    episodes: Vec::new(),
                },
            );
            return Ok(true);
        }

        Ok(false)
    }

    async fn list_episodes(&self, credentials: &Credentials) -> Result<Vec<Episode>, HostError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.with_authorized(credentials, |account| Ok(account.episodes.clone()))
    }

    async fn get_episode(&self, credentials: &Credentials, id: i64) -> Result<Episode, HostError> {
        self.with_authorized(credentials, |account| {
            account
                .episodes
                .iter()
                .find(|episode| episode.id == id)
                .cloned()
                .ok_or(HostError::EpisodeNotFound { id })
        })
    }

    async fn create_episode(
        &self,
        credentials: &Credentials,
        draft: &EpisodeDraft,
    ) -> Result<Episode, HostError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;

        self.with_authorized(credentials, |account| {
            let episode = Episode {
                id,
                title: draft.title.clone(),
                description: Some(draft.description.clone()),
                audio_url: draft.audio_url.clone(),
                artwork_url: None,
                published_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
                duration: None,
                total_plays: Some(0),
                private: true,
            };
            account.episodes.insert(0, episode.clone());
            Ok(episode)
        })
    }

    async fn update_episode(
        &self,
        credentials: &Credentials,
        id: i64,
        changes: &EpisodeChanges,
    ) -> Result<Episode, HostError> {
        if self.updates_unavailable.load(Ordering::SeqCst) {
            return Err(HostError::HttpStatus {
                url: format!("memory://{}/episodes/{}", credentials.account_id, id),
                status: 503,
            });
        }

        self.with_authorized(credentials, |account| {
            let episode = account
                .episodes
                .iter_mut()
                .find(|episode| episode.id == id)
                .ok_or(HostError::EpisodeNotFound { id })?;

            if let Some(title) = &changes.title {
                episode.title = title.clone();
            }
            if let Some(description) = &changes.description {
                episode.description = Some(description.clone());
            }
            if let Some(private) = changes.private {
                episode.private = private;
            }
            Ok(episode.clone())
        })
    }
}
