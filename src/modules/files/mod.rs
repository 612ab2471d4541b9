use axum::Router;
use axum::routing::get;
use crate::state::AppState;

pub mod handler;

pub fn router() -> axum::Router<AppState> {
    Router::new().route("/files/{name}", get(handler::serve_file))
}
