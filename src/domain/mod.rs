//! Domain layer - Core entities and ports

pub mod avatar;
pub mod directory;
pub mod error;
pub mod event;
pub mod notification;
pub mod storage;
pub mod user;

pub use avatar::{AvatarLookup, BlobStore, CacheEntry, ContentHash, ContentHasher};
pub use directory::DirectoryClient;
pub use error::DomainError;
pub use event::{CreationEvent, EventPublisher, EventType};
pub use notification::{EmailMessage, MailTransport};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use user::{
    validate_new_profile, validate_profile_patch, validate_user_id, NewUserProfile, ProfilePatch,
    UserId, UserProfile, UserRecord, UserRepository, UserValidationError,
};
