use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }
}

/// One entry in the active conversation. Ids are generated locally when the
/// entry is appended optimistically; persistence promotes the entry in place
/// under the same id via the store's replace-by-id path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// None while the session is anonymous or the chat has not been saved.
    pub conversation_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
