//! Application state for shared services

use std::sync::Arc;

use crate::domain::{EventPublisher, UserRepository};
use crate::infrastructure::avatar::AvatarCache;
use crate::infrastructure::services::UserCreationService;

/// Services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserCreationService>,
    pub avatar_cache: Arc<AvatarCache>,
    pub users: Arc<dyn UserRepository>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl AppState {
    pub fn new(
        user_service: UserCreationService,
        avatar_cache: AvatarCache,
        users: Arc<dyn UserRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_service: Arc::new(user_service),
            avatar_cache: Arc::new(avatar_cache),
            users,
            publisher,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("user_service", &self.user_service)
            .field("avatar_cache", &self.avatar_cache)
            .finish_non_exhaustive()
    }
}
