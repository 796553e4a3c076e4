use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::user::UserRecord;

/// Kind tag carried by every creation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "user.created")]
    UserCreated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserCreated => "user.created",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message announced to downstream consumers
///
/// Serialized as `{"eventType": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationEvent {
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

impl CreationEvent {
    pub fn user_created(user: &UserRecord) -> Self {
        Self {
            event_type: EventType::UserCreated,
            payload: json!({
                "id": user.id().as_str(),
                "email": user.email(),
                "firstName": user.first_name(),
                "lastName": user.last_name(),
                "createdAt": user.created_at(),
            }),
        }
    }

    /// Identifier of the subject user, if the payload carries one
    pub fn subject_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(|v| v.as_str())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{NewUserProfile, UserId};

    #[test]
    fn test_user_created_wire_format() {
        let user = UserRecord::new(
            UserId::new("42").unwrap(),
            NewUserProfile {
                first_name: "Ada".to_string(),
                last_name: None,
                email: "ada@example.com".to_string(),
            },
        );

        let event = CreationEvent::user_created(&user);
        let json: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();

        assert_eq!(json["eventType"], "user.created");
        assert_eq!(json["payload"]["id"], "42");
        assert_eq!(json["payload"]["email"], "ada@example.com");
        assert_eq!(event.subject_id(), Some("42"));
    }
}
