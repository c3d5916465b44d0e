use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::profile::Psychologist;

/// Backend session: the bearer token plus the identity id sent alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity_id: String,
}

impl Session {
    pub fn new(token: impl Into<String>, identity_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity_id: identity_id.into(),
        }
    }
}

/// Telegram login widget payload. Forwarded to the backend untouched; the
/// backend checks `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl IdentityAssertion {
    /// Fixed assertion for a local backend running in dev mode.
    pub fn dev() -> Self {
        Self {
            id: 123456789,
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
            username: Some("testuser".to_string()),
            photo_url: None,
            auth_date: Utc::now().timestamp(),
            hash: "dev_hash".to_string(),
        }
    }

    /// Identity id as carried in the `X-Telegram-ID` header.
    pub fn identity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Response of `POST /api/auth/telegram`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub psychologist: Psychologist,
    #[serde(default)]
    pub is_new: bool,
}
