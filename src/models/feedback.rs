use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-text feedback with a 1-5 rating, linked to whichever identity was
/// active when it was submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub body: String,
    pub rating: i64,
    pub account_id: Option<String>,
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
}
