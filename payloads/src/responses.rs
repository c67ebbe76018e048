use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{CourseId, Role, UserId};

/// The identity the server associates with a session.
///
/// The client treats this as a cache of server truth: it may be rendered
/// from persisted storage before the server has confirmed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: Timestamp,
    pub last_login: Option<Timestamp>,
}

/// Returned by the login and registration endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// One window of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    pub title: String,
    pub subject: String,
    pub teacher_name: String,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&Role::Teacher).unwrap();
        assert_eq!(json, r#""teacher""#);
    }

    #[test]
    fn profile_deserializes_with_null_last_login() {
        let raw = r#"{
            "user_id": "6f2f0e63-9f7f-4f30-a1ac-bd5d3a0ad2a6",
            "username": "alice",
            "email": "alice@example.com",
            "role": "student",
            "created_at": "2024-01-01T00:00:00Z",
            "last_login": null
        }"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.last_login, None);
    }
}
