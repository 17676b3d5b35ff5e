use axum::{
    Extension, Json,
    extract::State,
};
use tracing::info;

use ksb_chat::convert::user_from_row;
use ksb_types::api::{SetBannedRequest, UpdateProfileRequest};
use ksb_types::models::User;

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{Claims, active_user, current_user};

const MAX_PROFILE_FIELD: usize = 32;
const MAX_AVATAR_URL: usize = 2048;

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    blocking(&state, move |s| Ok(Json(current_user(s, &claims)?))).await
}

/// PATCH /users/me: partial update; absent fields are left alone.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let code_name = profile_field("code_name", req.code_name, MAX_PROFILE_FIELD)?;
    let rank = profile_field("rank", req.rank, MAX_PROFILE_FIELD)?;
    let status = profile_field("status", req.status, MAX_PROFILE_FIELD)?;
    let avatar_url = profile_field("avatar_url", req.avatar_url, MAX_AVATAR_URL)?;

    blocking(&state, move |s| {
        let user = active_user(s, &claims)?;
        let row = s
            .db()
            .update_profile(
                user.id,
                code_name.as_deref(),
                rank.as_deref(),
                status.as_deref(),
                avatar_url.as_deref(),
            )?
            .ok_or(ApiError::Unauthorized)?;
        Ok(Json(user_from_row(row)))
    })
    .await
}

/// GET /users: directory used to pick direct-message targets.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<User>>> {
    blocking(&state, move |s| {
        let users: Vec<User> = s.db().list_users()?.into_iter().map(user_from_row).collect();
        Ok(Json(users))
    })
    .await
}

/// POST /users/{id}/ban: admin only. History of a banned user stays visible;
/// the ban only blocks further writes.
pub async fn set_banned(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SetBannedRequest>,
) -> ApiResult<Json<User>> {
    blocking(&state, move |s| {
        let admin = active_user(s, &claims)?;
        if !admin.is_admin {
            return Err(ApiError::Forbidden("admin privileges required".into()));
        }
        if admin.id == user_id {
            return Err(ApiError::BadRequest("admins cannot ban themselves".into()));
        }

        let row = s
            .db()
            .set_banned(user_id, req.banned)?
            .ok_or_else(|| ApiError::NotFound(format!("user {} not found", user_id)))?;

        info!("user.ban: id={} banned={} by={}", user_id, req.banned, admin.id);
        Ok(Json(user_from_row(row)))
    })
    .await
}

fn profile_field(name: &str, value: Option<String>, max: usize) -> ApiResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim().to_string();
    if value.is_empty() || value.chars().count() > max {
        return Err(ApiError::BadRequest(format!("{} must be 1-{} characters", name, max)));
    }
    Ok(Some(value))
}
