//! User validation utilities

use thiserror::Error;
use validator::Validate;

use super::entity::{NewUserProfile, ProfilePatch};
use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("User ID cannot be empty")]
    EmptyId,

    #[error("User ID exceeds maximum length of {0} characters")]
    IdTooLong(usize),

    #[error("User ID must start with a letter or number")]
    InvalidIdStart,

    #[error("User ID must end with a letter or number")]
    InvalidIdEnd,

    #[error("User ID contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidIdCharacter(char),

    #[error("User ID cannot contain consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("{0} cannot be blank")]
    BlankField(&'static str),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        match err {
            UserValidationError::BlankField(_) | UserValidationError::InvalidProfile(_) => {
                DomainError::validation(err.to_string())
            }
            _ => DomainError::invalid_id(err.to_string()),
        }
    }
}

const MAX_USER_ID_LENGTH: usize = 64;

/// Validate a user ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 64 characters
/// - Only alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
/// - No consecutive hyphens
pub fn validate_user_id(id: &str) -> Result<(), UserValidationError> {
    if id.is_empty() {
        return Err(UserValidationError::EmptyId);
    }

    if id.len() > MAX_USER_ID_LENGTH {
        return Err(UserValidationError::IdTooLong(MAX_USER_ID_LENGTH));
    }

    let chars: Vec<char> = id.chars().collect();

    if !chars[0].is_ascii_alphanumeric() {
        return Err(UserValidationError::InvalidIdStart);
    }

    if !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return Err(UserValidationError::InvalidIdEnd);
    }

    let mut prev_hyphen = false;

    for c in &chars {
        if *c == '-' {
            if prev_hyphen {
                return Err(UserValidationError::ConsecutiveHyphens);
            }
            prev_hyphen = true;
        } else if c.is_ascii_alphanumeric() {
            prev_hyphen = false;
        } else {
            return Err(UserValidationError::InvalidIdCharacter(*c));
        }
    }

    Ok(())
}

/// Validate a creation profile
///
/// Rules:
/// - First name present, not blank, at most 100 characters
/// - Last name at most 100 characters
/// - Email syntactically valid, at most 254 characters
pub fn validate_new_profile(profile: &NewUserProfile) -> Result<(), UserValidationError> {
    profile
        .validate()
        .map_err(|e| UserValidationError::InvalidProfile(e.to_string()))?;

    if profile.first_name.trim().is_empty() {
        return Err(UserValidationError::BlankField("first_name"));
    }

    Ok(())
}

/// Validate a partial profile update
pub fn validate_profile_patch(patch: &ProfilePatch) -> Result<(), UserValidationError> {
    patch
        .validate()
        .map_err(|e| UserValidationError::InvalidProfile(e.to_string()))?;

    if patch
        .first_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(UserValidationError::BlankField("first_name"));
    }

    Ok(())
}
