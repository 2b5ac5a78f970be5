use std::sync::Arc;

use anyhow::Result;

use crate::models::{derive_title, Identity, Message, Role};
use crate::providers::types::BackendError;
use crate::providers::ModelBackend;
use crate::services::chats::ChatManager;
use crate::services::database::Database;
use crate::services::identity::SessionResolver;
use crate::services::store::{SharedStore, Status};

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The exchange completed and the bot reply is in the store.
    Completed,
    /// The backend rejected the turn; an error reply is in the store.
    Failed(String),
    /// Empty input, or a submission while one was already in flight.
    Ignored,
}

/// Turns one submitted string into an optimistic user entry, a model backend
/// call, and a bot entry, then persists the exchange to whichever scope the
/// active identity owns. The `Sending` status is the only mutual exclusion:
/// a submission arriving mid-flight is dropped, not queued.
#[derive(Clone)]
pub struct MessageDispatcher {
    store: SharedStore,
    backend: Arc<dyn ModelBackend>,
    db: Database,
    resolver: Arc<SessionResolver>,
    chats: Arc<ChatManager>,
}

impl MessageDispatcher {
    pub fn new(
        store: SharedStore,
        backend: Arc<dyn ModelBackend>,
        db: Database,
        resolver: Arc<SessionResolver>,
        chats: Arc<ChatManager>,
    ) -> Self {
        Self {
            store,
            backend,
            db,
            resolver,
            chats,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        // Guard and optimistic append under one lock: the user message is
        // visible before the outbound request is issued.
        let mut user_msg = {
            let mut store = self.store.lock().unwrap();
            if store.status().is_sending() {
                return SubmitOutcome::Ignored;
            }
            store.set_status(Status::Sending);
            let msg = Message::new(Role::User, text, self.chats.selected());
            store.append(msg.clone());
            msg
        };

        let identity = self.resolver.current();

        // A signed-in submit with nothing selected starts a new saved chat,
        // titled from this first message.
        let mut conversation_id = self.chats.selected();
        if identity.is_authenticated() && conversation_id.is_none() {
            match self.chats.create(&derive_title(text)).await {
                Ok(chat) => conversation_id = Some(chat.id),
                Err(e) => {
                    tracing::error!("Failed to create conversation, continuing unsaved: {}", e);
                }
            }
        }

        if user_msg.conversation_id != conversation_id {
            // Promote the optimistic entry to its saved form in place.
            user_msg.conversation_id = conversation_id.clone();
            self.store.lock().unwrap().append(user_msg.clone());
        }

        let turns = self.store.lock().unwrap().turns();

        match self.backend.send_message(&turns).await {
            Ok(reply) => {
                let mut bot_msg =
                    Message::new(Role::Bot, reply.message, conversation_id.clone());
                bot_msg.created_at = reply.timestamp;
                {
                    let mut store = self.store.lock().unwrap();
                    store.append(bot_msg.clone());
                    store.mark_animatable(&bot_msg.id);
                    store.set_status(Status::Idle);
                }
                self.persist_exchange(&identity, conversation_id.as_deref(), &user_msg, &bot_msg)
                    .await;
                SubmitOutcome::Completed
            }
            Err(err) => {
                let reason = err.to_string();
                let bot_msg =
                    Message::new(Role::Bot, Self::error_reply(&err), conversation_id.clone());
                {
                    let mut store = self.store.lock().unwrap();
                    store.append(bot_msg.clone());
                    store.mark_animatable(&bot_msg.id);
                    store.set_status(Status::Error(reason.clone()));
                }
                self.persist_exchange(&identity, conversation_id.as_deref(), &user_msg, &bot_msg)
                    .await;
                SubmitOutcome::Failed(reason)
            }
        }
    }

    /// Start a fresh conversation. Rotates the anonymous token iff the
    /// identity is still anonymous; an authenticated reset never touches it.
    pub async fn reset(&self) -> Result<()> {
        self.chats.clear_selection();
        self.store.lock().unwrap().reset();
        self.resolver.rotate_anonymous().await?;
        Ok(())
    }

    /// Load the view for the current identity: the saved blob for an
    /// anonymous token, a fresh greeting for a signed-in account. Used at
    /// startup and after every sign-in/sign-out transition; anonymous and
    /// account history are disjoint scopes and are never merged.
    pub async fn restore_view(&self) -> Result<()> {
        self.chats.clear_selection();
        match self.resolver.current() {
            Identity::Anonymous { token } => {
                let list = match self.db.get_anonymous_session(&token).await? {
                    Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                        tracing::warn!("Discarding unreadable session blob: {}", e);
                        Vec::new()
                    }),
                    None => Vec::new(),
                };
                self.store.lock().unwrap().hydrate(list);
            }
            Identity::Authenticated { .. } => {
                self.store.lock().unwrap().reset();
            }
        }
        Ok(())
    }

    /// The turn is already on screen; a failed save must not roll it back.
    /// Account messages land as rows, anonymous history as one blob upsert
    /// per completed exchange.
    async fn persist_exchange(
        &self,
        identity: &Identity,
        conversation_id: Option<&str>,
        user_msg: &Message,
        bot_msg: &Message,
    ) {
        match identity {
            Identity::Authenticated { .. } => {
                let Some(chat_id) = conversation_id else {
                    return;
                };
                for msg in [user_msg, bot_msg] {
                    if let Err(e) = self.db.upsert_message(msg).await {
                        tracing::error!("Failed to save message: {}", e);
                    }
                }
                if let Err(e) = self.db.touch_chat(chat_id).await {
                    tracing::error!("Failed to update chat timestamp: {}", e);
                }
            }
            Identity::Anonymous { token } => {
                let json = {
                    let store = self.store.lock().unwrap();
                    serde_json::to_string(store.messages()).unwrap_or_default()
                };
                if let Err(e) = self.db.upsert_anonymous_session(token, &json).await {
                    tracing::error!("Failed to save anonymous session: {}", e);
                }
            }
        }
    }

    fn error_reply(err: &BackendError) -> String {
        format!(
            "I apologize, but I'm having trouble connecting right now. Error: {}. Please try again in a moment.",
            err
        )
    }
}
