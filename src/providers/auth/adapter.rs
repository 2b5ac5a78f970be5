use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::providers::traits::IdentityGateway;
use crate::providers::types::{AccountSession, AuthError};

pub struct HttpIdentityGateway {
    client: Client,
    base_url: String,
}

impl HttpIdentityGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> AuthError {
        if let Ok(parsed) = serde_json::from_str::<AuthErrorBody>(body) {
            return AuthError::Rejected(format!("HTTP {}: {}", status.as_u16(), parsed.error));
        }
        AuthError::Rejected(format!("HTTP {}: Request failed", status.as_u16()))
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn exchange_code(&self, code: &str) -> Result<AccountSession, AuthError> {
        let url = format!("{}/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&TokenRequestBody { code })
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &body));
        }

        let session: TokenResponseBody = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(AccountSession {
            account_id: session.account_id,
            access_token: session.access_token,
        })
    }

    async fn restore_session(&self, access_token: &str) -> Result<AccountSession, AuthError> {
        let url = format!("{}/session", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&SessionRequestBody { access_token })
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &body));
        }

        let session: SessionResponseBody = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(AccountSession {
            account_id: session.account_id,
            access_token: access_token.to_string(),
        })
    }
}
