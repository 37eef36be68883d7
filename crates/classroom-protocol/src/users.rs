//! Participant identity and role types.

use serde::{Deserialize, Serialize};

/// Role a participant carries on the wire, as reported by membership
/// notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// The teacher of the room.
    Host,
    /// A student allowed to publish media.
    Broadcaster,
    /// A student consuming media only.
    Audience,
}

/// Local role of this attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Teacher,
    Student,
}

/// Room interaction mode; decides how students attach to the media transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    /// Students publish media (join as broadcasters).
    Interactive,
    /// Students consume media only (join as audience).
    Lecture,
}

impl Role {
    /// Wire role used when entering the room.
    ///
    /// Teachers always join as host; students join as broadcaster or
    /// audience depending on the room type.
    #[must_use]
    pub const fn media_role(self, room_type: RoomType) -> UserRole {
        match self {
            Role::Teacher => UserRole::Host,
            Role::Student => match room_type {
                RoomType::Interactive => UserRole::Broadcaster,
                RoomType::Lecture => UserRole::Audience,
            },
        }
    }
}

/// One participant as reported by the transport's membership view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_uuid: String,
    #[serde(default)]
    pub user_name: String,
    pub role: UserRole,
}

impl UserInfo {
    /// Convenience constructor.
    #[must_use]
    pub fn new(user_uuid: impl Into<String>, user_name: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_uuid: user_uuid.into(),
            user_name: user_name.into(),
            role,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_role_mapping() {
        assert_eq!(
            Role::Teacher.media_role(RoomType::Interactive),
            UserRole::Host
        );
        assert_eq!(Role::Teacher.media_role(RoomType::Lecture), UserRole::Host);
        assert_eq!(
            Role::Student.media_role(RoomType::Interactive),
            UserRole::Broadcaster
        );
        assert_eq!(
            Role::Student.media_role(RoomType::Lecture),
            UserRole::Audience
        );
    }

    #[test]
    fn test_user_info_roundtrip() {
        let user = UserInfo::new("u1", "Ada", UserRole::Broadcaster);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userUuid"], "u1");
        assert_eq!(json["role"], "broadcaster");

        let back: UserInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_user_name_defaults_empty() {
        let user: UserInfo =
            serde_json::from_value(serde_json::json!({"userUuid": "u1", "role": "host"})).unwrap();
        assert_eq!(user.user_name, "");
        assert_eq!(user.role, UserRole::Host);
    }
}
