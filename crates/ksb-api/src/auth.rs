use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use ksb_chat::ChatService;
use ksb_chat::convert::user_from_row;
use ksb_db::Database;
use ksb_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chat: ChatService,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

impl AppStateInner {
    pub fn db(&self) -> &Database {
        self.chat.db()
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::BadRequest("username must be 3-32 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }
    let code_name = req
        .code_name
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| username.clone());

    let response = blocking(&state, move |s| {
        let password_hash = hash_password(&req.password)?;
        let row = s
            .db()
            .create_user(&username, &password_hash, &code_name, false)?
            .ok_or_else(|| ApiError::Conflict("username is already taken".into()))?;
        let user = user_from_row(row);
        let token = create_token(&s.jwt_secret, s.token_ttl_days, user.id, &user.username)?;

        info!("user.register: id={} username={}", user.id, user.username);
        Ok(AuthResponse { user, token })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    blocking(&state, move |s| {
        let row = s
            .db()
            .get_user_by_username(req.username.trim())?
            .ok_or(ApiError::Unauthorized)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {}", row.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        let user = user_from_row(row);
        let token = create_token(&s.jwt_secret, s.token_ttl_days, user.id, &user.username)?;
        Ok(Json(AuthResponse { user, token }))
    })
    .await
}

/// Argon2id hash with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, ttl_days: i64, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
