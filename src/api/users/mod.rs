//! User and avatar endpoints

mod avatars;
mod profiles;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;
use super::types::ApiError;
use crate::domain::{DomainError, UserId};

pub use avatars::AvatarDeletedResponse;
pub use profiles::UserResponse;

/// Routes mounted under `/api`
pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(profiles::create_user))
        .route("/user/{id}", get(profiles::get_user).patch(profiles::update_user))
        .route(
            "/user/{id}/avatar",
            get(avatars::get_avatar).delete(avatars::delete_avatar),
        )
}

fn parse_user_id(raw: String) -> Result<UserId, ApiError> {
    Ok(UserId::new(raw).map_err(DomainError::from)?)
}
