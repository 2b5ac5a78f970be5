use async_trait::async_trait;

use super::types::{AccountSession, AuthError, BackendError, ChatReply, ChatTurn};

/// The hosted model endpoint. Takes the full ordered history and returns one
/// reply; there is no streaming and no client-side prompt construction.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn send_message(&self, turns: &[ChatTurn]) -> Result<ChatReply, BackendError>;
}

/// The hosted identity provider, treated as an opaque credential issuer.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Exchange an authorization code for a signed-in session.
    async fn exchange_code(&self, code: &str) -> Result<AccountSession, AuthError>;

    /// Validate a previously-stored access token.
    async fn restore_session(&self, access_token: &str) -> Result<AccountSession, AuthError>;
}
