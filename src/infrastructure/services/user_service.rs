//! User service - creation workflow and directory reads

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    validate_new_profile, validate_profile_patch, CreationEvent, DirectoryClient, DomainError,
    EmailMessage, EventPublisher, NewUserProfile, ProfilePatch, UserId, UserProfile, UserRecord,
    UserRepository,
};
use crate::infrastructure::notification::NotificationSender;

/// User as returned by the read path
///
/// Profile fields come from the upstream directory when it knows the user and
/// from the local record otherwise. `avatar_hash` always comes from the local record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetails {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub avatar_hash: Option<String>,
}

impl UserDetails {
    fn from_upstream(profile: UserProfile, local: Option<&UserRecord>) -> Self {
        Self {
            id: profile.id,
            email: Some(profile.email),
            first_name: Some(profile.first_name),
            last_name: Some(profile.last_name),
            avatar: Some(profile.avatar).filter(|url| !url.is_empty()),
            avatar_hash: local
                .and_then(|record| record.avatar_hash())
                .map(|hash| hash.to_string()),
        }
    }

    fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id().to_string(),
            email: record.email().map(str::to_string),
            first_name: record.first_name().map(str::to_string),
            last_name: record.last_name().map(str::to_string),
            avatar: None,
            avatar_hash: record.avatar_hash().map(|hash| hash.to_string()),
        }
    }
}

/// Orchestrates user creation and serves user reads
///
/// Persistence alone decides the outcome of `create_user`. The creation event
/// and welcome email are side channels whose failures are logged, never returned.
#[derive(Clone)]
pub struct UserCreationService {
    users: Arc<dyn UserRepository>,
    directory: Arc<dyn DirectoryClient>,
    publisher: Arc<dyn EventPublisher>,
    notifier: NotificationSender,
    background_side_effects: bool,
}

impl std::fmt::Debug for UserCreationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCreationService")
            .field("notifier", &self.notifier)
            .field("background_side_effects", &self.background_side_effects)
            .finish()
    }
}

impl UserCreationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        directory: Arc<dyn DirectoryClient>,
        publisher: Arc<dyn EventPublisher>,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            users,
            directory,
            publisher,
            notifier,
            background_side_effects: true,
        }
    }

    /// Run publish and notify on a spawned task instead of inline
    pub fn with_background_side_effects(mut self, enabled: bool) -> Self {
        self.background_side_effects = enabled;
        self
    }

    /// Create a user, then announce it
    pub async fn create_user(&self, profile: NewUserProfile) -> Result<UserRecord, DomainError> {
        validate_new_profile(&profile)?;

        let record = UserRecord::new(UserId::generate(), profile);
        let created = self.users.create(record).await?;

        info!(user_id = %created.id(), "User created");

        if self.background_side_effects {
            let publisher = self.publisher.clone();
            let notifier = self.notifier.clone();
            let record = created.clone();

            tokio::spawn(async move {
                announce(publisher.as_ref(), &notifier, &record).await;
            });
        } else {
            announce(self.publisher.as_ref(), &self.notifier, &created).await;
        }

        Ok(created)
    }

    /// Apply a partial profile update to an existing record
    pub async fn update_profile(
        &self,
        id: &UserId,
        patch: ProfilePatch,
    ) -> Result<UserRecord, DomainError> {
        validate_profile_patch(&patch)?;

        let updated = if patch.is_empty() {
            self.users.get(id).await?
        } else {
            self.users.update_profile(id, &patch).await?
        };

        let updated =
            updated.ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))?;

        info!(user_id = %id, "User profile updated");

        Ok(updated)
    }

    /// Look a user up in the directory, enriched with local state
    pub async fn find_user(&self, id: &UserId) -> Result<UserDetails, DomainError> {
        let local = self.users.get(id).await?;

        match self.directory.lookup(id).await {
            Ok(profile) => Ok(UserDetails::from_upstream(profile, local.as_ref())),
            Err(DomainError::NotFound { message }) => match local {
                Some(record) if !record.is_avatar_only() => {
                    debug!(user_id = %id, "Upstream has no such user, serving local record");
                    Ok(UserDetails::from_record(&record))
                }
                _ => Err(DomainError::NotFound { message }),
            },
            Err(e) => Err(e),
        }
    }
}

/// Publish the creation event and send the welcome email concurrently
async fn announce(publisher: &dyn EventPublisher, notifier: &NotificationSender, user: &UserRecord) {
    let event = CreationEvent::user_created(user);

    let notify = async {
        match user.email() {
            Some(email) => {
                notifier
                    .send(&EmailMessage::welcome(email, user.first_name()))
                    .await
            }
            None => Ok(()),
        }
    };

    let (published, notified) = tokio::join!(publisher.publish(&event), notify);

    if let Err(e) = published {
        warn!(user_id = %user.id(), error = %e, "Creation event not published");
    }

    if let Err(e) = notified {
        warn!(user_id = %user.id(), error = %e, "Welcome email not delivered");
    }
}
