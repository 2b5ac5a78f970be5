use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, saved chat. Only signed-in accounts own conversations; anonymous
/// history lives in the session blob instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TITLE_WORDS: usize = 7;

/// Derive a conversation title from the first user message: the first seven
/// whitespace-separated words, with an ellipsis only when words were dropped.
pub fn derive_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > TITLE_WORDS {
        format!("{}...", words[..TITLE_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}
