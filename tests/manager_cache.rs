//! Snapshot persistence in `podcasts.manager_blob`.

mod common;

use common::TestApp;
use podcast_console::infrastructure::podcast_host::{Credentials, EpisodeDraft, InMemoryHost};
use podcast_console::modules::auth::repository::AuthRepository;
use podcast_console::modules::podcast::manager::{ManagerCache, ManagerHandle};
use podcast_console::modules::podcast::repository::PodcastRepository;
use time::Duration;

fn creds() -> Credentials {
    Credentials::new("111", "tok-a")
}

async fn app_with_rows(rows: usize) -> TestApp {
    let app = TestApp::spawn(InMemoryHost::new().with_account("111", "tok-a")).await;
    let user = AuthRepository::create_user(&app.state.db, "alice", "not-a-real-hash")
        .await
        .unwrap();

    for i in 0..rows {
        PodcastRepository::create(&app.state.db, user.id, &format!("Show {}", i), "111", "tok-a")
            .await
            .unwrap();
    }
    app
}

async fn set_blob(app: &TestApp, blob: &str) {
    sqlx::query("UPDATE podcasts SET manager_blob = ?")
        .bind(blob)
        .execute(&app.state.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn absent_or_corrupt_snapshot_gives_a_fresh_handle() {
    let app = app_with_rows(1).await;

    let handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    assert_eq!(handle, ManagerHandle::new(creds()));

    set_blob(&app, "\u{80}\u{4}pickled-bytes").await;
    let handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    assert_eq!(handle, ManagerHandle::new(creds()));

    set_blob(&app, r#"{"version":99,"account_id":"111","episodes":[],"fetched_at":null}"#).await;
    let handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    assert_eq!(handle, ManagerHandle::new(creds()));
}

#[tokio::test]
async fn unknown_account_gives_a_fresh_handle() {
    let app = app_with_rows(0).await;

    let other = Credentials::new("404", "nope");
    let handle = ManagerCache::get_manager(&app.state.db, other.clone()).await;
    assert_eq!(handle, ManagerHandle::new(other));
}

#[tokio::test]
async fn storing_twice_loads_an_equivalent_handle() {
    let app = app_with_rows(1).await;
    let host = app.host.clone();

    let mut handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    handle.list_episodes(&*host, Duration::minutes(5)).await.unwrap();
    handle
        .post_episode(
            &*host,
            &EpisodeDraft {
                title: "Cached".to_string(),
                description: String::new(),
                audio_url: None,
            },
        )
        .await
        .unwrap();

    ManagerCache::update_manager(&app.state.db, &handle).await.unwrap();
    let first = ManagerCache::get_manager(&app.state.db, creds()).await;

    ManagerCache::update_manager(&app.state.db, &first).await.unwrap();
    let second = ManagerCache::get_manager(&app.state.db, creds()).await;

    assert_eq!(first, handle);
    assert_eq!(second, first);
    assert_eq!(second.cached_episodes()[0].title, "Cached");
}

#[tokio::test]
async fn snapshot_is_shared_by_every_row_of_an_account() {
    let app = app_with_rows(2).await;
    let host = app.host.clone();

    let mut handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    handle.refresh(&*host).await.unwrap();
    ManagerCache::update_manager(&app.state.db, &handle).await.unwrap();

    let blobs: Vec<Option<String>> = sqlx::query_scalar("SELECT manager_blob FROM podcasts ORDER BY id")
        .fetch_all(&app.state.db)
        .await
        .unwrap();

    assert_eq!(blobs.len(), 2);
    assert!(blobs[0].is_some());
    assert_eq!(blobs[0], blobs[1]);
}

#[tokio::test]
async fn cached_listing_avoids_the_host_across_requests() {
    let app = app_with_rows(1).await;
    let host = app.host.clone();
    let ttl = Duration::minutes(5);

    let mut handle = ManagerCache::get_manager(&app.state.db, creds()).await;
    handle.list_episodes(&*host, ttl).await.unwrap();
    ManagerCache::update_manager(&app.state.db, &handle).await.unwrap();

    let mut reloaded = ManagerCache::get_manager(&app.state.db, creds()).await;
    reloaded.list_episodes(&*host, ttl).await.unwrap();

    assert_eq!(host.list_calls(), 1);
}
