use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Request types ---

#[derive(Debug, Serialize)]
pub struct ChatRequestBody {
    pub messages: Vec<WireTurn>,
}

#[derive(Debug, Serialize)]
pub struct WireTurn {
    pub role: String,
    pub content: String,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
pub struct ChatReplyBody {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// --- Error types ---

#[derive(Debug, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
