use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::providers::traits::ModelBackend;
use crate::providers::types::{BackendError, ChatReply, ChatTurn};

pub struct HttpModelBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpModelBackend {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn build_body(turns: &[ChatTurn]) -> ChatRequestBody {
        ChatRequestBody {
            messages: turns
                .iter()
                .map(|t| WireTurn {
                    role: t.role.as_str().to_string(),
                    content: t.content.clone(),
                })
                .collect(),
        }
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> BackendError {
        if let Ok(parsed) = serde_json::from_str::<BackendErrorBody>(body) {
            return BackendError::Rejected {
                status: status.as_u16(),
                error: parsed.error,
                details: parsed.details.map(|d| d.to_string()),
            };
        }
        BackendError::Rejected {
            status: status.as_u16(),
            error: "Request failed".to_string(),
            details: None,
        }
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<ChatReply, BackendError> {
        let url = format!("{}/chat", self.base_url);

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&Self::build_body(turns));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &body));
        }

        let reply: ChatReplyBody = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if reply.message.is_empty() {
            return Err(BackendError::InvalidResponse(
                "No message in response".to_string(),
            ));
        }

        Ok(ChatReply {
            message: reply.message,
            timestamp: reply.timestamp,
        })
    }
}
