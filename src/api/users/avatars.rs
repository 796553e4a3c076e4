//! Avatar endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, info};

use super::parse_user_id;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

#[derive(Debug, Clone, Serialize)]
pub struct AvatarDeletedResponse {
    pub message: String,
    pub hash: String,
}

/// GET /api/user/{id}/avatar
///
/// Responds with the base64-encoded image as plain text.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_user_id(id)?;
    debug!(user_id = %id, "Getting avatar");

    let bytes = state.avatar_cache.get_or_fetch(&id).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        STANDARD.encode(&bytes),
    ))
}

/// DELETE /api/user/{id}/avatar
pub async fn delete_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AvatarDeletedResponse>, ApiError> {
    let id = parse_user_id(id)?;

    match state.avatar_cache.evict(&id).await? {
        Some(hash) => {
            info!(user_id = %id, hash = %hash, "Avatar deleted");

            Ok(Json(AvatarDeletedResponse {
                message: "Avatar successfully deleted".to_string(),
                hash: hash.to_string(),
            }))
        }
        None => Err(ApiError::not_found("Avatar could not be found")),
    }
}
