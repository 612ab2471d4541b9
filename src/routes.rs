use utoipa::OpenApi;
use crate::docs::ApiDoc;
use axum::{routing::get, Json, Router};
use crate::state::AppState;

use tower_http::cors::{Any, CorsLayer};

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(api_routes())
        .nest("/auth", crate::modules::auth::router(state.clone()))
        .merge(crate::modules::files::router())
        .merge(crate::modules::podcast::router(state))
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
}
