use super::batch::{resolve_base_url, BatchForm};
use super::dto::{
    EpisodeEditForm, PodcastDetailsResponse, PodcastForm, PodcastResponse, PublishForm,
    PublishedEpisode,
};
use super::service::PodcastService;
use crate::common::error::AppError;
use crate::common::response::{ApiResponse, ApiSuccess};
use crate::infrastructure::podcast_host::Episode;
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::FormRejection, Extension, Multipart, Path, State,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Form,
};

/// List the current user's podcasts
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Registered podcasts", body = ApiResponse<Vec<PodcastResponse>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn list_podcasts(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> impl IntoResponse {
    match PodcastService::list(state, claims.sub).await {
        Ok(podcasts) => ApiSuccess::ok(podcasts, "Podcasts retrieved successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Empty create form
#[utoipa::path(
    get,
    path = "/create",
    responses(
        (status = 200, description = "Form fields", body = ApiResponse<PodcastForm>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn create_form() -> impl IntoResponse {
    ApiSuccess::ok(PodcastForm::default(), "Create a podcast")
}

/// Register a podcast account
#[utoipa::path(
    post,
    path = "/create",
    request_body(content = PodcastForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Podcast created", body = ApiResponse<PodcastResponse>),
        (status = 400, description = "Invalid form or credentials"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn create_podcast(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    form: Result<Form<PodcastForm>, FormRejection>,
) -> impl IntoResponse {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    match PodcastService::create(state, claims.sub, form).await {
        Ok(podcast) => ApiSuccess::created(podcast, "Podcast created successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current values for the update form
#[utoipa::path(
    get,
    path = "/{id}/update",
    params(("id" = i64, Path, description = "Podcast record ID")),
    responses(
        (status = 200, description = "Podcast", body = ApiResponse<PodcastResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn update_form(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => ApiSuccess::ok(PodcastResponse::from(podcast), "Update podcast").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Replace a podcast's name and credentials
#[utoipa::path(
    post,
    path = "/{id}/update",
    params(("id" = i64, Path, description = "Podcast record ID")),
    request_body(content = PodcastForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Podcast updated", body = ApiResponse<PodcastResponse>),
        (status = 400, description = "Invalid form or credentials"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn update_podcast(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<i64>,
    form: Result<Form<PodcastForm>, FormRejection>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    match PodcastService::update(state, podcast, form).await {
        Ok(podcast) => ApiSuccess::ok(podcast, "Podcast updated successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Remove a podcast account
#[utoipa::path(
    post,
    path = "/{id}/delete",
    params(("id" = i64, Path, description = "Podcast record ID")),
    responses(
        (status = 200, description = "Podcast deleted", body = ApiResponse<String>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Podcasts"
)]
pub async fn delete_podcast(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };

    match PodcastService::delete(state, podcast).await {
        Ok(()) => ApiSuccess::ok(String::new(), "Podcast deleted successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

async fn details(state: AppState, claims: TokenClaims, id: i64, refresh: bool) -> Response {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };

    match PodcastService::details(state, podcast, refresh).await {
        Ok(details) => ApiSuccess::ok(details, "Podcast details retrieved successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Podcast with its newest episodes, served from the cache while fresh
#[utoipa::path(
    get,
    path = "/{id}/details",
    params(("id" = i64, Path, description = "Podcast record ID")),
    responses(
        (status = 200, description = "Podcast details", body = ApiResponse<PodcastDetailsResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn get_details(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    details(state, claims, id, false).await
}

/// Same as GET, but always refetches the episode list
#[utoipa::path(
    post,
    path = "/{id}/details",
    params(("id" = i64, Path, description = "Podcast record ID")),
    responses(
        (status = 200, description = "Podcast details", body = ApiResponse<PodcastDetailsResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn refresh_details(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    details(state, claims, id, true).await
}

/// Episode and its current visibility
#[utoipa::path(
    get,
    path = "/{id}/details/{epid}/publish_conf",
    params(
        ("id" = i64, Path, description = "Podcast record ID"),
        ("epid" = i64, Path, description = "Episode ID on the host")
    ),
    responses(
        (status = 200, description = "Episode", body = ApiResponse<Episode>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast or episode not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn publish_conf(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path((id, episode_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };

    match PodcastService::episode(state, podcast, episode_id).await {
        Ok(episode) => ApiSuccess::ok(episode, "Episode retrieved successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Make an episode public when `public` is sent, private otherwise
#[utoipa::path(
    post,
    path = "/{id}/details/{epid}/publish_conf",
    params(
        ("id" = i64, Path, description = "Podcast record ID"),
        ("epid" = i64, Path, description = "Episode ID on the host")
    ),
    request_body(content = PublishForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Visibility changed", body = ApiResponse<Episode>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast or episode not found"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn set_publish_conf(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path((id, episode_id)): Path<(i64, i64)>,
    form: Result<Form<PublishForm>, FormRejection>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };
    // An unchecked box sends nothing at all
    let public = form.map(|Form(form)| form.public.is_some()).unwrap_or(false);

    match PodcastService::set_visibility(state, podcast, episode_id, public).await {
        Ok(episode) => ApiSuccess::ok(episode, "Episode visibility updated").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Episode as the host currently has it
#[utoipa::path(
    get,
    path = "/{id}/details/{epid}/edit",
    params(
        ("id" = i64, Path, description = "Podcast record ID"),
        ("epid" = i64, Path, description = "Episode ID on the host")
    ),
    responses(
        (status = 200, description = "Episode", body = ApiResponse<Episode>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast or episode not found"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn edit_form(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path((id, episode_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };

    match PodcastService::edit_view(state, podcast, episode_id).await {
        Ok(episode) => ApiSuccess::ok(episode, "Episode retrieved successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update title, description and visibility
#[utoipa::path(
    post,
    path = "/{id}/details/{epid}/edit",
    params(
        ("id" = i64, Path, description = "Podcast record ID"),
        ("epid" = i64, Path, description = "Episode ID on the host")
    ),
    request_body(content = EpisodeEditForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Episode Updated", body = ApiResponse<Episode>),
        (status = 400, description = "Bad Request"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast or episode not found"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn edit_episode(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path((id, episode_id)): Path<(i64, i64)>,
    form: Result<Form<EpisodeEditForm>, FormRejection>,
) -> impl IntoResponse {
    let podcast = match PodcastService::get_owned(&state, claims.sub, id).await {
        Ok(podcast) => podcast,
        Err(e) => return e.into_response(),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    match PodcastService::edit_episode(state, podcast, episode_id, form).await {
        Ok(episode) => ApiSuccess::ok(episode, "Episode Updated").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Podcasts available as batch targets
#[utoipa::path(
    get,
    path = "/batch_upload",
    responses(
        (status = 200, description = "Batch targets", body = ApiResponse<Vec<PodcastResponse>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn batch_form(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> impl IntoResponse {
    match PodcastService::list(state, claims.sub).await {
        Ok(podcasts) => ApiSuccess::ok(podcasts, "Batch upload").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Post one episode to each selected podcast
///
/// Fields are grouped by podcast record ID: `{id}_title`, `{id}_description`,
/// `{id}_file` (.mp3), `{id}_public` and `{id}_post`. Only groups carrying
/// `{id}_post` are published.
#[utoipa::path(
    post,
    path = "/batch_upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Grouped episode fields"),
    responses(
        (status = 201, description = "Podcasts Uploaded!", body = ApiResponse<Vec<PublishedEpisode>>),
        (status = 400, description = "Filetype must be .mp3"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Podcast not found"),
        (status = 413, description = "Upload too large"),
        (status = 502, description = "Podcast host error")
    ),
    security(("bearer_auth" = [])),
    tag = "Episodes"
)]
pub async fn batch_upload(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return AppError::Validation(rejection.body_text()).into_response(),
    };

    let host_header = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    let base_url = match resolve_base_url(state.config.public_base_url.as_ref(), host_header) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    let form = match BatchForm::read(&mut multipart, &state).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    match PodcastService::batch_upload(state, claims.sub, form, base_url).await {
        Ok(published) => ApiSuccess::created(published, "Podcasts Uploaded!").into_response(),
        Err(e) => e.into_response(),
    }
}
