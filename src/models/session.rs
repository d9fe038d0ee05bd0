//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side record of a login
///
/// Created once at login and never updated afterwards. The record lives in
/// the session store until `expires_at`, which equals the expiry of the
/// refresh token issued with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID, also carried as the `id` claim of both tokens
    pub id: Uuid,
    /// Owning principal
    pub username: String,
    /// The refresh token issued for this session, verbatim
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: String,
    pub client_ip: String,
    /// Set administratively; a blocked session is unusable
    pub is_blocked: bool,
}

impl Session {
    /// Time left before the record must disappear from the store
    pub fn remaining_ttl(&self) -> chrono::Duration {
        self.expires_at - Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: chrono::Duration) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            refresh_token: "refresh".to_string(),
            created_at: now,
            expires_at: now + expires_in,
            user_agent: "curl/8.0".to_string(),
            client_ip: "127.0.0.1".to_string(),
            is_blocked: false,
        }
    }

    #[test]
    fn test_remaining_ttl_sign() {
        assert!(session(chrono::Duration::hours(1)).remaining_ttl() > chrono::Duration::zero());
        assert!(session(chrono::Duration::seconds(-5)).remaining_ttl() < chrono::Duration::zero());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(session(chrono::Duration::hours(1))).unwrap();
        for field in [
            "id",
            "username",
            "refresh_token",
            "created_at",
            "expires_at",
            "user_agent",
            "client_ip",
            "is_blocked",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}
