use axum::{Extension, Json, extract::State};

use ksb_chat::convert::intel_link_from_row;
use ksb_types::models::IntelLink;

use crate::auth::{AppState, blocking};
use crate::error::ApiResult;
use crate::middleware::Claims;

/// GET /intel: the informational link feed.
pub async fn list_intel(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<IntelLink>>> {
    blocking(&state, move |s| {
        let links: Vec<IntelLink> = s
            .db()
            .list_intel_links()?
            .into_iter()
            .map(intel_link_from_row)
            .collect();
        Ok(Json(links))
    })
    .await
}
