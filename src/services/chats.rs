use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Conversation, Identity};
use crate::services::database::Database;
use crate::services::identity::SessionResolver;
use crate::services::store::SharedStore;

/// The set of saved conversations belonging to the signed-in account, plus
/// the currently-selected one. Every operation rejects or returns empty when
/// the identity is anonymous.
pub struct ChatManager {
    db: Database,
    resolver: Arc<SessionResolver>,
    selected: Mutex<Option<String>>,
}

impl ChatManager {
    pub fn new(db: Database, resolver: Arc<SessionResolver>) -> Self {
        Self {
            db,
            resolver,
            selected: Mutex::new(None),
        }
    }

    pub fn selected(&self) -> Option<String> {
        self.selected.lock().unwrap().clone()
    }

    pub fn clear_selection(&self) {
        *self.selected.lock().unwrap() = None;
    }

    fn owner_id(&self) -> Option<String> {
        match self.resolver.current() {
            Identity::Authenticated { account_id } => Some(account_id),
            Identity::Anonymous { .. } => None,
        }
    }

    /// Conversations owned by the current account, most recently updated
    /// first. Empty while anonymous.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        match self.owner_id() {
            Some(owner) => self.db.list_chats(&owner).await,
            None => Ok(Vec::new()),
        }
    }

    /// Create a conversation and make it current.
    pub async fn create(&self, title: &str) -> Result<Conversation> {
        let owner_id = match self.owner_id() {
            Some(owner) => owner,
            None => bail!("Sign in to save conversations"),
        };

        let now = Utc::now();
        let chat = Conversation {
            id: Uuid::new_v4().to_string(),
            owner_id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_chat(&chat).await?;
        *self.selected.lock().unwrap() = Some(chat.id.clone());
        Ok(chat)
    }

    /// Select a saved conversation and hydrate the store with its messages.
    pub async fn select(&self, id: &str, store: &SharedStore) -> Result<()> {
        if self.owner_id().is_none() {
            bail!("Sign in to open saved conversations");
        }
        if self.db.get_chat(id).await?.is_none() {
            bail!("No such conversation");
        }

        let messages = self.db.list_messages(id).await?;
        *self.selected.lock().unwrap() = Some(id.to_string());
        store.lock().unwrap().hydrate(messages);
        Ok(())
    }

    /// Delete a conversation. Deleting the current one clears the selection
    /// and falls back to a fresh conversation.
    pub async fn delete(&self, id: &str, store: &SharedStore) -> Result<()> {
        if self.owner_id().is_none() {
            bail!("Sign in to manage saved conversations");
        }

        self.db.delete_chat(id).await?;

        let mut selected = self.selected.lock().unwrap();
        if selected.as_deref() == Some(id) {
            *selected = None;
            drop(selected);
            store.lock().unwrap().reset();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::providers::types::{AccountSession, AuthError};
    use crate::providers::IdentityGateway;
    use crate::services::store::shared_store;

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

    async fn setup(signed_in: bool) -> (Database, Arc<SessionResolver>, ChatManager) {
        let db = Database::new_in_memory().unwrap();
        let resolver = Arc::new(
            SessionResolver::resolve(db.clone(), Arc::new(FakeGateway), None)
                .await
                .unwrap(),
        );
        if signed_in {
            resolver.sign_in("code").await.unwrap();
        }
        let manager = ChatManager::new(db.clone(), resolver.clone());
        (db, resolver, manager)
    }

    #[tokio::test]
    async fn test_anonymous_operations_are_rejected_or_empty() {
        let (_db, _resolver, manager) = setup(false).await;
        let store = shared_store();

        assert!(manager.list().await.unwrap().is_empty());
        assert!(manager.create("title").await.is_err());
        assert!(manager.select("any", &store).await.is_err());
        assert!(manager.delete("any", &store).await.is_err());
    }

    #[tokio::test]
    async fn test_create_selects_and_lists_most_recent_first() {
        let (db, _resolver, manager) = setup(true).await;

        let first = manager.create("first").await.unwrap();
        assert_eq!(manager.selected(), Some(first.id.clone()));

        let second = manager.create("second").await.unwrap();
        db.touch_chat(&second.id).await.unwrap();

        let titles: Vec<String> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_select_hydrates_store() {
        let (db, _resolver, manager) = setup(true).await;
        let store = shared_store();

        let chat = manager.create("saved").await.unwrap();
        let msg = crate::models::Message::new(
            crate::models::Role::User,
            "stored line",
            Some(chat.id.clone()),
        );
        db.upsert_message(&msg).await.unwrap();

        manager.select(&chat.id, &store).await.unwrap();

        let store = store.lock().unwrap();
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "stored line");
    }

    #[tokio::test]
    async fn test_select_empty_chat_falls_back_to_greeting() {
        let (_db, _resolver, manager) = setup(true).await;
        let store = shared_store();

        let chat = manager.create("empty").await.unwrap();
        manager.select(&chat.id, &store).await.unwrap();

        assert_eq!(store.lock().unwrap().messages().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_selected_clears_selection_and_resets() {
        let (_db, _resolver, manager) = setup(true).await;
        let store = shared_store();

        let chat = manager.create("doomed").await.unwrap();
        store
            .lock()
            .unwrap()
            .append(crate::models::Message::new(
                crate::models::Role::User,
                "hi",
                Some(chat.id.clone()),
            ));

        manager.delete(&chat.id, &store).await.unwrap();

        assert!(manager.selected().is_none());
        assert_eq!(store.lock().unwrap().messages().len(), 1);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unselected_keeps_current_view() {
        let (_db, _resolver, manager) = setup(true).await;
        let store = shared_store();

        let keep = manager.create("keep").await.unwrap();
        let doomed = manager.create("doomed").await.unwrap();
        manager.select(&keep.id, &store).await.unwrap();

        manager.delete(&doomed.id, &store).await.unwrap();

        assert_eq!(manager.selected(), Some(keep.id));
    }
}
