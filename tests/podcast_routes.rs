//! Credential CRUD, ownership checks and the episode views.

mod common;

use axum::http::StatusCode;
use common::{form_request, get_request, TestApp};
use podcast_console::infrastructure::podcast_host::InMemoryHost;
use podcast_console::modules::podcast::repository::PodcastRepository;

fn host() -> InMemoryHost {
    InMemoryHost::new()
        .with_account("111", "tok-a")
        .with_account("222", "tok-b")
}

#[tokio::test]
async fn create_list_update_delete() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;

    let id = app.add_podcast(&token, "Morning Show", "111", "tok-a").await;

    let (status, body) = app.send(get_request("/", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let podcasts = body["data"].as_array().unwrap();
    assert_eq!(podcasts.len(), 1);
    assert_eq!(podcasts[0]["podcast_name"], "Morning Show");
    assert!(podcasts[0].get("token").is_none());

    let (status, body) = app
        .send(form_request(
            &format!("/{}/update", id),
            Some(&token),
            &[("podcast_name", "Evening Show"), ("podcast_id", "222"), ("token", "tok-b")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["podcast_name"], "Evening Show");
    assert_eq!(body["data"]["podcast_id"], "222");

    let (status, _) = app
        .send(form_request(&format!("/{}/delete", id), Some(&token), &[]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(get_request("/", Some(&token))).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_form_reports_first_problem() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;

    let cases: [(&[(&str, &str)], &str); 5] = [
        (&[("podcast_id", "111"), ("token", "tok-a")], "A Name is required"),
        (&[("podcast_name", "Show"), ("token", "tok-a")], "An ID is required"),
        (&[("podcast_name", "Show"), ("podcast_id", "11a"), ("token", "tok-a")], "Invalid ID"),
        (&[("podcast_name", "Show"), ("podcast_id", "111")], "A token is required"),
        (
            &[("podcast_name", "Show"), ("podcast_id", "111"), ("token", "wrong")],
            "No Buzzsprout Account with given ID and Token",
        ),
    ];

    for (fields, expected) in cases {
        let (status, body) = app.send(form_request("/create", Some(&token), fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], expected);
    }

    let (_, body) = app.send(get_request("/", Some(&token))).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_id_is_not_found_for_get_and_post() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;

    for path in ["/999/update", "/999/details", "/999/details/1/publish_conf", "/999/details/1/edit"] {
        let (status, body) = app.send(get_request(path, Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {}", path);
        assert_eq!(body["message"], "Podcast with ID 999 doesn't exist");

        // Body is deliberately empty: the record check comes first.
        let (status, _) = app.send(form_request(path, Some(&token), &[])).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "POST {}", path);
    }

    let (status, _) = app.send(form_request("/999/delete", Some(&token), &[])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_users_records_are_forbidden() {
    let app = TestApp::spawn(host()).await;
    let alice = app.sign_up("alice").await;
    let mallory = app.sign_up("mallory").await;

    let id = app.add_podcast(&alice, "Morning Show", "111", "tok-a").await;

    for path in ["update", "details", "details/1/publish_conf", "details/1/edit"] {
        let path = format!("/{}/{}", id, path);
        let (status, _) = app.send(get_request(&path, Some(&mallory))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "GET {}", path);

        let (status, _) = app.send(form_request(&path, Some(&mallory), &[])).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "POST {}", path);
    }

    let (status, _) = app
        .send(form_request(&format!("/{}/delete", id), Some(&mallory), &[]))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.send(get_request("/", Some(&mallory))).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn authenticated_routes_require_a_token() {
    let app = TestApp::spawn(host()).await;

    for path in ["/", "/create", "/1/update", "/1/details", "/1/details/1/edit", "/batch_upload", "/auth/me"] {
        let (status, _) = app.send(get_request(path, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {}", path);
    }

    let (status, _) = app.send(form_request("/1/delete", None, &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(get_request("/", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn files_and_health_are_public() {
    let app = TestApp::spawn(host()).await;

    let (status, _) = app.send(get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(get_request("/files/nothing-here.mp3", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "File nothing-here.mp3 doesn't exist");
}

#[tokio::test]
async fn updating_credentials_clears_the_cached_manager() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;
    let id = app.add_podcast(&token, "Morning Show", "111", "tok-a").await;

    let (status, _) = app.send(get_request(&format!("/{}/details", id), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let podcast = PodcastRepository::find_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(podcast.manager_blob.is_some());

    let (status, _) = app
        .send(form_request(
            &format!("/{}/update", id),
            Some(&token),
            &[("podcast_name", "Morning Show"), ("podcast_id", "111"), ("token", "tok-a")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let podcast = PodcastRepository::find_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(podcast.manager_blob.is_none());
}

#[tokio::test]
async fn details_use_the_cache_until_refreshed() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;
    let id = app.add_podcast(&token, "Morning Show", "111", "tok-a").await;
    let path = format!("/{}/details", id);

    app.send(get_request(&path, Some(&token))).await;
    let (status, body) = app.send(get_request(&path, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["podcast"]["id"], id);
    assert!(body["data"]["fetched_at"].is_string());
    assert_eq!(app.host.list_calls(), 1);

    let (status, _) = app.send(form_request(&path, Some(&token), &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.host.list_calls(), 2);
}

#[tokio::test]
async fn publish_then_unpublish_and_edit() {
    let app = TestApp::spawn(host()).await;
    let token = app.sign_up("alice").await;
    let id = app.add_podcast(&token, "Morning Show", "111", "tok-a").await;

    let upload = common::MultipartBuilder::new()
        .text(&format!("{}_title", id), "Pilot")
        .text(&format!("{}_post", id), "on")
        .into_request("/batch_upload", &token);
    let (status, body) = app.send(upload).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let episode_id = body["data"][0]["episode"]["id"].as_i64().unwrap();

    let conf = format!("/{}/details/{}/publish_conf", id, episode_id);
    let (status, body) = app.send(form_request(&conf, Some(&token), &[("public", "on")])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["private"], false);

    let (status, body) = app.send(form_request(&conf, Some(&token), &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["private"], true);
    assert!(app.host.episodes("111")[0].private);

    let edit = format!("/{}/details/{}/edit", id, episode_id);
    let (status, body) = app.send(get_request(&edit, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Pilot");

    let (status, body) = app
        .send(form_request(
            &edit,
            Some(&token),
            &[("title", "Pilot (remastered)"), ("description", "Now louder"), ("not_private", "on")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Episode Updated");
    assert_eq!(body["data"]["title"], "Pilot (remastered)");
    assert_eq!(body["data"]["private"], false);

    let (status, body) = app.send(get_request(&format!("/{}/details/9999/edit", id), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Episode with ID 9999 doesn't exist");
}
