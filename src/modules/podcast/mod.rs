use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use crate::common::error::AppError;
use crate::state::AppState;
use axum::middleware;
use tower_http::limit::RequestBodyLimitLayer;

pub mod batch;
pub mod dto;
pub mod handler;
pub mod manager;
pub mod model;
pub mod repository;
pub mod service;

pub fn router(state: AppState) -> axum::Router<AppState> {
    let max_upload_bytes = state.config.max_upload_bytes;

    let batch_routes = Router::new()
        .route("/batch_upload", get(handler::batch_form).post(handler::batch_upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(middleware::map_response(oversized_upload));

    Router::new()
        .route("/", get(handler::list_podcasts))
        .route("/create", get(handler::create_form).post(handler::create_podcast))
        .route("/{id}/update", get(handler::update_form).post(handler::update_podcast))
        .route("/{id}/delete", post(handler::delete_podcast))
        .route("/{id}/details", get(handler::get_details).post(handler::refresh_details))
        .route(
            "/{id}/details/{epid}/publish_conf",
            get(handler::publish_conf).post(handler::set_publish_conf),
        )
        .route(
            "/{id}/details/{epid}/edit",
            get(handler::edit_form).post(handler::edit_episode),
        )
        .merge(batch_routes)
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware
        ))
}

/// The body limit answers in plain text; keep the JSON envelope instead.
async fn oversized_upload(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge.into_response()
    } else {
        response
    }
}
