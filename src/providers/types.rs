use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected (HTTP {status}): {error}")]
    Rejected {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity provider unreachable: {0}")]
    Unavailable(String),

    #[error("Credential exchange rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One `{role, content}` pair of the payload sent to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// A completed model reply.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A validated signed-in session issued by the identity gateway.
#[derive(Debug, Clone)]
pub struct AccountSession {
    pub account_id: String,
    pub access_token: String,
}
