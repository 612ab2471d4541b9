use super::dto::{AuthResponse, LoginRequest, RegisterRequest, TokenClaims, UserResponse};
use super::service::AuthService;
use crate::common::error::AppError;
use crate::common::response::{ApiResponse, ApiSuccess};
use crate::state::AppState;
use axum::{
    extract::{rejection::FormRejection, Extension, State},
    response::IntoResponse,
    Form,
};
use tower_cookies::{Cookie, Cookies};

pub const SESSION_COOKIE: &str = "access_token";

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body(content = RegisterRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Bad Request")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Form<RegisterRequest>, FormRejection>,
) -> impl IntoResponse {
    let Form(payload) = match payload {
        Ok(form) => form,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    match AuthService::register(state, payload).await {
        Ok(user) => ApiSuccess::created(user, "User registered successfully").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Login and receive a session token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Result<Form<LoginRequest>, FormRejection>,
) -> impl IntoResponse {
    let Form(payload) = match payload {
        Ok(form) => form,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };
    let max_age = state.config.session_ttl_secs;

    match AuthService::login(state, payload).await {
        Ok(response) => {
            let mut cookie = Cookie::new(SESSION_COOKIE, response.access_token.clone());
            cookie.set_http_only(true);
            cookie.set_path("/");
            cookie.set_secure(false); // Keep false for HTTP localhost
            cookie.set_max_age(Some(time::Duration::seconds(max_age as i64)));
            cookies.add(cookie);

            ApiSuccess::ok(response, "Login successful").into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out successfully", body = ApiResponse<String>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(cookies: Cookies, Extension(claims): Extension<TokenClaims>) -> impl IntoResponse {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    tracing::info!("User {} logged out", claims.username);
    ApiSuccess::ok(String::new(), "Logged out successfully").into_response()
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> impl IntoResponse {
    match AuthService::me(state, claims.sub).await {
        Ok(user) => ApiSuccess::ok(user, "User retrieved successfully").into_response(),
        Err(e) => e.into_response(),
    }
}
