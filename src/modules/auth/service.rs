use super::dto::{AuthResponse, LoginRequest, RegisterRequest, TokenClaims, UserResponse};
use super::model::User;
use super::repository::AuthRepository;
use crate::common::error::{validation_error, AppError, AppResult};
use crate::common::security;
use crate::config::settings::AppConfig;
use crate::state::AppState;
use anyhow::anyhow;
use jsonwebtoken::{decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub struct AuthService;

impl AuthService {
    pub async fn register(state: AppState, req: RegisterRequest) -> AppResult<UserResponse> {
        req.validate()
            .map_err(|e| validation_error(&e, &["username", "password"]))?;

        if AuthRepository::find_user_by_username(&state.db, &req.username)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(format!(
                "User {} is already registered.",
                req.username
            )));
        }

        let password_hash = security::hash_password(&req.password)?;
        let user = AuthRepository::create_user(&state.db, &req.username, &password_hash).await?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(Self::to_response(user))
    }

    pub async fn login(state: AppState, req: LoginRequest) -> AppResult<AuthResponse> {
        req.validate()
            .map_err(|e| validation_error(&e, &["username", "password"]))?;

        let user = AuthRepository::find_user_by_username(&state.db, &req.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        security::verify_password(&req.password, &user.password_hash)
            .map_err(|_| AppError::Unauthorized)?;

        let access_token = Self::create_access_token(&state.config, &user)?;

        Ok(AuthResponse {
            access_token,
            access_token_expires_in: state.config.session_ttl_secs,
            user: Self::to_response(user),
        })
    }

    pub async fn me(state: AppState, user_id: Uuid) -> AppResult<UserResponse> {
        let user = AuthRepository::find_user_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Self::to_response(user))
    }

    pub fn create_access_token(config: &AppConfig, user: &User) -> AppResult<String> {
        let now = get_current_timestamp() as usize;

        let claims = TokenClaims {
            sub: user.id,
            username: user.username.clone(),
            exp: now + config.session_ttl_secs as usize,
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow!("Failed to sign token: {}", e)))
    }

    pub fn verify_access_token(config: &AppConfig, token: &str) -> AppResult<TokenClaims> {
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
    }

    fn to_response(user: User) -> UserResponse {
        UserResponse {
            id: user.id,
            username: user.username,
        }
    }
}
