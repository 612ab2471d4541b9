use crate::common::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Serve an uploaded audio file
///
/// Unauthenticated: the podcast host fetches audio from here.
#[utoipa::path(
    get,
    path = "/files/{name}",
    params(
        ("name" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Files"
)]
pub async fn serve_file(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    let Some(path) = state.storage.resolve(&name) else {
        return not_found(&name).into_response();
    };

    let file = match File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return not_found(&name).into_response(),
        Err(e) => return AppError::Io(e).into_response(),
    };

    let metadata = match file.metadata().await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return not_found(&name).into_response(),
        Err(e) => return AppError::Io(e).into_response(),
    };

    let content_type = mime_guess::from_path(&path).first_or(mime::APPLICATION_OCTET_STREAM);
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(body)
        .unwrap_or_else(|e| AppError::Internal(e.into()).into_response())
}

fn not_found(name: &str) -> AppError {
    AppError::NotFound(format!("File {} doesn't exist", name))
}
