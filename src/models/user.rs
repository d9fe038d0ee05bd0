//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user, keyed by username
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Username (primary key, alphanumeric)
    pub username: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    /// Email address (unique)
    pub email: String,
    /// Last password change, `None` if never changed
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, safe to return from the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// Input for inserting a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            username: "alice".to_string(),
            hashed_password: "$argon2id$v=19$secret".to_string(),
            full_name: "Alice Liddell".to_string(),
            email: "alice@example.com".to_string(),
            password_changed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hashed_password_never_serialized() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_profile_from_user() {
        let user = user();
        let profile = UserProfile::from(&user);
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.created_at, user.created_at);
        assert_eq!(profile.password_changed_at, None);
    }
}
