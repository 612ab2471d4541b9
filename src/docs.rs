use utoipa::OpenApi;
use crate::infrastructure::podcast_host::Episode;
use crate::modules::auth::dto::*;
use crate::modules::podcast::dto::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::handler::register,
        crate::modules::auth::handler::login,
        crate::modules::auth::handler::logout,
        crate::modules::auth::handler::get_me,
        crate::modules::podcast::handler::list_podcasts,
        crate::modules::podcast::handler::create_form,
        crate::modules::podcast::handler::create_podcast,
        crate::modules::podcast::handler::update_form,
        crate::modules::podcast::handler::update_podcast,
        crate::modules::podcast::handler::delete_podcast,
        crate::modules::podcast::handler::get_details,
        crate::modules::podcast::handler::refresh_details,
        crate::modules::podcast::handler::publish_conf,
        crate::modules::podcast::handler::set_publish_conf,
        crate::modules::podcast::handler::edit_form,
        crate::modules::podcast::handler::edit_episode,
        crate::modules::podcast::handler::batch_form,
        crate::modules::podcast::handler::batch_upload,
        crate::modules::files::handler::serve_file,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, AuthResponse, UserResponse,
            PodcastForm, PodcastResponse, PodcastDetailsResponse,
            PublishForm, EpisodeEditForm, PublishedEpisode, Episode,
        )
    ),
    tags(
        (name = "Auth", description = "Console accounts and sessions"),
        (name = "Podcasts", description = "Podcast host credentials"),
        (name = "Episodes", description = "Episode listing, editing and batch upload"),
        (name = "Files", description = "Uploaded audio served to the podcast host")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

use utoipa::Modify;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
