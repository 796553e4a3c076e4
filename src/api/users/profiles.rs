//! Profile endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::debug;

use super::parse_user_id;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{NewUserProfile, ProfilePatch, UserRecord};
use crate::infrastructure::services::UserDetails;

/// Locally stored user
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id().to_string(),
            first_name: user.first_name().map(String::from),
            last_name: user.last_name().map(String::from),
            email: user.email().map(String::from),
            avatar_hash: user.avatar_hash().map(|hash| hash.to_string()),
            created_at: user.created_at().to_rfc3339(),
            updated_at: user.updated_at().to_rfc3339(),
        }
    }
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(profile): Json<NewUserProfile>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    debug!(email = %profile.email, "Creating user");

    let user = state.user_service.create_user(profile).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// GET /api/user/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserDetails>, ApiError> {
    let id = parse_user_id(id)?;
    debug!(user_id = %id, "Getting user");

    let user = state.user_service.find_user(&id).await?;

    Ok(Json(user))
}

/// PATCH /api/user/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_user_id(id)?;
    debug!(user_id = %id, "Updating user");

    let user = state.user_service.update_profile(&id, patch).await?;

    Ok(Json(UserResponse::from(&user)))
}
