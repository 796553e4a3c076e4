//! User domain
//!
//! User records owned by the local record store, profiles reported by the
//! upstream directory, and the repository port.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUserProfile, ProfilePatch, UserId, UserProfile, UserRecord};
pub use repository::UserRepository;
pub use validation::{
    validate_new_profile, validate_profile_patch, validate_user_id, UserValidationError,
};

#[cfg(test)]
pub use repository::MockUserRepository;
