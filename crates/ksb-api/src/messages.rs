use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use ksb_types::api::{EditMessageRequest, ListMessagesQuery, SendMessageRequest};
use ksb_types::models::{Message, MessageView};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{Claims, active_user};

/// GET /messages: full history of the group channel, or of the direct thread
/// with `target_id`. Clients poll this every few seconds.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<ListMessagesQuery>,
) -> ApiResult<Json<Vec<MessageView>>> {
    blocking(&state, move |s| {
        let views = s.chat.list_messages(claims.sub, query.target_id)?;
        Ok(Json(views))
    })
    .await
}

/// POST /messages: author is always the authenticated user.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = blocking(&state, move |s| {
        let author = active_user(s, &claims)?;
        let new_message = req
            .into_new_message(author.id)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(s.chat.send_message(new_message)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// PATCH /messages/{id}: author only.
pub async fn edit_message(
    State(state): State<AppState>,
    ApiPath(message_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<EditMessageRequest>,
) -> ApiResult<Json<Message>> {
    blocking(&state, move |s| {
        let requester = active_user(s, &claims)?;
        let message = s.chat.edit_message(requester.id, message_id, &req.content)?;
        Ok(Json(message))
    })
    .await
}

/// DELETE /messages/{id}: author or admin.
pub async fn delete_message(
    State(state): State<AppState>,
    ApiPath(message_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| {
        let requester = active_user(s, &claims)?;
        s.chat.delete_message(requester.id, message_id)?;
        Ok(Json(serde_json::json!({ "deleted": true })))
    })
    .await
}
