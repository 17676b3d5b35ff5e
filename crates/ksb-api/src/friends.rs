use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use ksb_chat::convert::{friend_from_row, user_from_row};
use ksb_types::api::FriendRequest;
use ksb_types::models::{Friend, User};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{Claims, active_user};

/// GET /friends: pending and accepted relations involving the caller.
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Friend>>> {
    blocking(&state, move |s| {
        let me = claims.sub;
        let rows = s.db().list_friendships(me)?;

        let other_ids: Vec<i64> = rows
            .iter()
            .map(|r| if r.user_id == me { r.friend_id } else { r.user_id })
            .collect();
        let users: HashMap<i64, User> = s
            .db()
            .get_users_by_ids(&other_ids)?
            .into_iter()
            .map(|row| (row.id, user_from_row(row)))
            .collect();

        let friends: Vec<Friend> = rows
            .iter()
            .filter_map(|row| {
                let other = if row.user_id == me { row.friend_id } else { row.user_id };
                users.get(&other).map(|user| friend_from_row(row, me, user))
            })
            .collect();
        Ok(Json(friends))
    })
    .await
}

/// POST /friends: send a request.
pub async fn request_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FriendRequest>,
) -> ApiResult<impl IntoResponse> {
    let friend = blocking(&state, move |s| {
        let me = active_user(s, &claims)?;
        if req.friend_id == me.id {
            return Err(ApiError::BadRequest("cannot befriend yourself".into()));
        }

        let other = s
            .db()
            .get_user_by_id(req.friend_id)?
            .map(user_from_row)
            .ok_or_else(|| ApiError::NotFound(format!("user {} not found", req.friend_id)))?;

        let row = s
            .db()
            .insert_friend_request(me.id, other.id)?
            .ok_or_else(|| ApiError::Conflict("friend request already exists".into()))?;

        info!("friend.request: {} -> {}", me.id, other.id);
        Ok(friend_from_row(&row, me.id, &other))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(friend)))
}

/// POST /friends/{id}/accept: accept a pending request sent by `id`.
pub async fn accept_friend(
    State(state): State<AppState>,
    ApiPath(requester_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Friend>> {
    blocking(&state, move |s| {
        let me = active_user(s, &claims)?;
        let row = s
            .db()
            .accept_friend_request(me.id, requester_id)?
            .ok_or_else(|| ApiError::NotFound("no pending request from this user".into()))?;

        let other = s
            .db()
            .get_user_by_id(requester_id)?
            .map(user_from_row)
            .ok_or_else(|| ApiError::NotFound(format!("user {} not found", requester_id)))?;

        info!("friend.accept: {} <- {}", me.id, requester_id);
        Ok(Json(friend_from_row(&row, me.id, &other)))
    })
    .await
}

/// DELETE /friends/{id}: cancel, decline, or unfriend.
pub async fn remove_friend(
    State(state): State<AppState>,
    ApiPath(other_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| {
        let me = active_user(s, &claims)?;
        let removed = s.db().remove_friendship(me.id, other_id)?;
        Ok(Json(serde_json::json!({ "removed": removed })))
    })
    .await
}
