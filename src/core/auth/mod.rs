use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed offline identity. There is no authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchAccountProfile {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub user_properties: String,
    pub user_type: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        let trimmed = username.trim();
        Self {
            username: if trimmed.is_empty() {
                "Player".into()
            } else {
                trimmed.to_string()
            },
            uuid: Uuid::nil().to_string(),
            access_token: "null".into(),
            user_properties: "{}".into(),
            user_type: "legacy".into(),
        }
    }
}
