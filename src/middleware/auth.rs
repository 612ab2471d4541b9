use crate::common::error::AppError;
use crate::modules::auth::handler::SESSION_COOKIE;
use crate::modules::auth::service::AuthService;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Bearer header first, then the session cookie
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .or_else(|| cookies.get(SESSION_COOKIE).map(|c| c.value().to_owned()))
        .filter(|token| !token.is_empty());

    let token = match token {
        Some(t) => t,
        None => return Err(AppError::Unauthorized),
    };

    // 2. Verify JWT
    let claims = AuthService::verify_access_token(&state.config, &token)?;

    // 3. Inject claims into request extensions
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
