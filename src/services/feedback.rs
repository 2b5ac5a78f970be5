use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Feedback, Identity};
use crate::services::database::Database;
use crate::services::identity::SessionResolver;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Feedback or rating is required")]
    MissingFields,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct FeedbackService {
    db: Database,
    resolver: Arc<SessionResolver>,
}

impl FeedbackService {
    pub fn new(db: Database, resolver: Arc<SessionResolver>) -> Self {
        Self { db, resolver }
    }

    /// Record feedback under whichever identity is active. At least one of
    /// body/rating is required; a rejected submission writes nothing.
    pub async fn submit(
        &self,
        body: Option<&str>,
        rating: Option<i64>,
    ) -> Result<Feedback, FeedbackError> {
        let body = body.map(str::trim).filter(|s| !s.is_empty());
        if body.is_none() && rating.is_none() {
            return Err(FeedbackError::MissingFields);
        }

        let (account_id, session_token) = match self.resolver.current() {
            Identity::Authenticated { account_id } => (Some(account_id), None),
            Identity::Anonymous { token } => (None, Some(token)),
        };

        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            body: body.unwrap_or_default().to_string(),
            rating: rating.unwrap_or(0),
            account_id,
            session_token,
            created_at: Utc::now(),
        };
        self.db.insert_feedback(&feedback).await?;
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    use crate::providers::types::{AccountSession, AuthError};
    use crate::providers::IdentityGateway;

    struct FakeGateway;

    #[async_trait]
    impl IdentityGateway for FakeGateway {
        async fn exchange_code(&self, _code: &str) -> Result<AccountSession, AuthError> {
            Ok(AccountSession {
                account_id: "account-1".to_string(),
                access_token: "access".to_string(),
            })
        }

        async fn restore_session(&self, _token: &str) -> Result<AccountSession, AuthError> {
            Err(AuthError::Unavailable("offline".to_string()))
        }
    }

    async fn service(signed_in: bool) -> FeedbackService {
        let db = Database::new_in_memory().unwrap();
        let resolver = Arc::new(
            SessionResolver::resolve(db.clone(), Arc::new(FakeGateway), None)
                .await
                .unwrap(),
        );
        if signed_in {
            resolver.sign_in("code").await.unwrap();
        }
        FeedbackService::new(db, resolver)
    }

    #[tokio::test]
    async fn test_empty_submission_is_rejected() {
        let service = service(false).await;
        assert!(matches!(
            service.submit(None, None).await,
            Err(FeedbackError::MissingFields)
        ));
        assert!(matches!(
            service.submit(Some("   "), None).await,
            Err(FeedbackError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_anonymous_feedback_links_session_token() {
        let service = service(false).await;
        let fb = service.submit(Some("Very helpful"), Some(5)).await.unwrap();
        assert!(fb.account_id.is_none());
        assert!(fb.session_token.is_some());
        assert_eq!(fb.rating, 5);
    }

    #[tokio::test]
    async fn test_signed_in_feedback_links_account() {
        let service = service(true).await;
        let fb = service.submit(None, Some(4)).await.unwrap();
        assert_eq!(fb.account_id.as_deref(), Some("account-1"));
        assert!(fb.session_token.is_none());
        assert_eq!(fb.body, "");
    }
}
