use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use ksb_chat::convert::user_from_row;
use ksb_types::models::User;

pub use ksb_types::api::Claims;

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Load the account behind a token. A token for an account that no longer
/// exists is treated as unauthenticated.
pub(crate) fn current_user(state: &AppStateInner, claims: &Claims) -> ApiResult<User> {
    let row = state
        .db()
        .get_user_by_id(claims.sub)?
        .ok_or(ApiError::Unauthorized)?;
    Ok(user_from_row(row))
}

/// Like [`current_user`], but refuses banned accounts. Used by every write.
pub(crate) fn active_user(state: &AppStateInner, claims: &Claims) -> ApiResult<User> {
    let user = current_user(state, claims)?;
    if user.is_banned {
        return Err(ApiError::Forbidden("account is banned".into()));
    }
    Ok(user)
}
