use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::Identity;
use crate::providers::types::AuthError;
use crate::providers::IdentityGateway;
use crate::services::credentials::CredentialStore;
use crate::services::database::Database;

const ANON_TOKEN_KEY: &str = "anonymous_token";
const SESSION_CREDENTIAL: &str = "session";

/// Owns the active visitor identity and every storage side effect attached to
/// it: the anonymous token in the settings table, the signed-in session token
/// in the keyring. Everything else reads identity through `current()` or the
/// watch subscription, never from storage directly.
pub struct SessionResolver {
    db: Database,
    gateway: Arc<dyn IdentityGateway>,
    credentials: Option<CredentialStore>,
    current: watch::Sender<Identity>,
}

impl SessionResolver {
    /// Resolve the startup identity. A stored credential that the gateway
    /// still accepts yields `Authenticated`; any failure along that path
    /// degrades to anonymous mode. This never blocks the chat surface on the
    /// identity provider.
    pub async fn resolve(
        db: Database,
        gateway: Arc<dyn IdentityGateway>,
        credentials: Option<CredentialStore>,
    ) -> Result<Self> {
        let mut identity = None;

        if let Some(store) = &credentials {
            match store.retrieve(SESSION_CREDENTIAL).await {
                Ok(Some(token)) => match gateway.restore_session(&token).await {
                    Ok(session) => {
                        identity = Some(Identity::Authenticated {
                            account_id: session.account_id,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Stored session not restored, staying anonymous: {}", e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Keyring unavailable, staying anonymous: {}", e);
                }
            }
        }

        let identity = match identity {
            Some(id) => id,
            None => Self::anonymous_identity(&db).await?,
        };

        let (current, _) = watch::channel(identity);
        Ok(Self {
            db,
            gateway,
            credentials,
            current,
        })
    }

    pub fn current(&self) -> Identity {
        self.current.borrow().clone()
    }

    /// Fires whenever the identity discriminant changes.
    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.current.subscribe()
    }

    /// Exchange an authorization code for a signed-in session and switch to
    /// it. The credential lands in the keyring; the account id is never
    /// written to local storage.
    pub async fn sign_in(&self, code: &str) -> Result<Identity, AuthError> {
        let session = self.gateway.exchange_code(code).await?;

        if let Some(store) = &self.credentials {
            if let Err(e) = store.store(SESSION_CREDENTIAL, &session.access_token).await {
                tracing::warn!("Failed to store session credential: {}", e);
            }
        }

        let identity = Identity::Authenticated {
            account_id: session.account_id,
        };
        self.current.send_replace(identity.clone());
        Ok(identity)
    }

    /// Drop the signed-in session and return to the existing anonymous token.
    /// Signing out does not rotate the token.
    pub async fn sign_out(&self) -> Result<Identity> {
        if let Some(store) = &self.credentials {
            if let Err(e) = store.delete(SESSION_CREDENTIAL).await {
                tracing::warn!("Failed to delete session credential: {}", e);
            }
        }

        let identity = Self::anonymous_identity(&self.db).await?;
        self.current.send_replace(identity.clone());
        Ok(identity)
    }

    /// Issue and persist a fresh anonymous token. Only applies while
    /// anonymous; a rotation request under an authenticated identity is
    /// ignored and returns false.
    pub async fn rotate_anonymous(&self) -> Result<bool> {
        if self.current().is_authenticated() {
            return Ok(false);
        }

        let token = Uuid::new_v4().to_string();
        self.db.set_setting(ANON_TOKEN_KEY, &token).await?;
        self.current.send_replace(Identity::Anonymous { token });
        Ok(true)
    }

    async fn anonymous_identity(db: &Database) -> Result<Identity> {
        let token = match db.get_setting(ANON_TOKEN_KEY).await? {
            Some(token) => token,
            None => {
                let token = Uuid::new_v4().to_string();
                db.set_setting(ANON_TOKEN_KEY, &token).await?;
                token
            }
        };
        Ok(Identity::Anonymous { token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::providers::types::AccountSession;

    struct FakeGateway {
        reject: AtomicBool,
    }

    impl FakeGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                reject: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl IdentityGateway for FakeGateway {
        async fn exchange_code(&self, code: &str) -> Result<AccountSession, AuthError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(AuthError::Rejected("bad code".to_string()));
            }
            Ok(AccountSession {
                account_id: format!("account-for-{}", code),
                access_token: "access".to_string(),
            })
        }

        async fn restore_session(&self, _access_token: &str) -> Result<AccountSession, AuthError> {
            Err(AuthError::Unavailable("offline".to_string()))
        }
    }

    async fn resolver() -> SessionResolver {
        let db = Database::new_in_memory().unwrap();
        SessionResolver::resolve(db, FakeGateway::new(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_startup_resolves_anonymous() {
        let resolver = resolver().await;
        assert!(matches!(
            resolver.current(),
            Identity::Anonymous { .. }
        ));
    }

    #[tokio::test]
    async fn test_anonymous_token_is_reused_across_resolves() {
        let db = Database::new_in_memory().unwrap();
        let a = SessionResolver::resolve(db.clone(), FakeGateway::new(), None)
            .await
            .unwrap()
            .current();
        let b = SessionResolver::resolve(db, FakeGateway::new(), None)
            .await
            .unwrap()
            .current();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_sign_in_switches_identity_and_notifies() {
        let resolver = resolver().await;
        let mut events = resolver.subscribe();

        resolver.sign_in("code-1").await.unwrap();

        assert_eq!(
            resolver.current(),
            Identity::Authenticated {
                account_id: "account-for-code-1".to_string()
            }
        );
        assert!(events.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_identity_untouched() {
        let db = Database::new_in_memory().unwrap();
        let gateway = FakeGateway::new();
        gateway.reject.store(true, Ordering::SeqCst);
        let resolver = SessionResolver::resolve(db, gateway, None).await.unwrap();
        let before = resolver.current();

        assert!(resolver.sign_in("code-1").await.is_err());
        assert_eq!(resolver.current(), before);
    }

    #[tokio::test]
    async fn test_rotation_only_while_anonymous() {
        let resolver = resolver().await;
        let before = resolver.current();

        assert!(resolver.rotate_anonymous().await.unwrap());
        let rotated = resolver.current();
        assert_ne!(before, rotated);

        resolver.sign_in("code-1").await.unwrap();
        assert!(!resolver.rotate_anonymous().await.unwrap());
        assert!(resolver.current().is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_same_token() {
        let resolver = resolver().await;
        let before = resolver.current();

        resolver.sign_in("code-1").await.unwrap();
        let after = resolver.sign_out().await.unwrap();
        assert_eq!(before, after);
    }
}
