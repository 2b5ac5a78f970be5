use std::sync::{Arc, Mutex};

use crate::config;
use crate::models::{Message, Role};
use crate::providers::types::ChatTurn;

/// The store is shared between the dispatcher, the chat manager, and the
/// surface; lock scopes stay short and are never held across awaits.
pub type SharedStore = Arc<Mutex<ConversationStore>>;

pub fn shared_store() -> SharedStore {
    Arc::new(Mutex::new(ConversationStore::new()))
}

/// Send-side state of the active conversation. `Error` is an idle state that
/// records the last failure; only `Sending` blocks a new submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Sending,
    Error(String),
}

impl Status {
    pub fn is_sending(&self) -> bool {
        matches!(self, Status::Sending)
    }
}

/// The ordered message sequence for the active conversation. Appends are
/// keyed by id: a second append under a known id replaces the entry in place,
/// which is how an optimistic entry is promoted to its persisted form without
/// ever showing a duplicate.
#[derive(Debug)]
pub struct ConversationStore {
    messages: Vec<Message>,
    status: Status,
    animate_id: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            messages: vec![Self::greeting()],
            status: Status::Idle,
            animate_id: None,
        }
    }

    fn greeting() -> Message {
        Message::new(Role::Bot, config::GREETING, None)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Append at the end, or replace in place when the id is already present.
    pub fn append(&mut self, message: Message) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        } else {
            self.messages.push(message);
        }
    }

    /// Clear to a single greeting message. Token rotation for anonymous
    /// sessions is the caller's job; the store only owns the sequence.
    pub fn reset(&mut self) {
        self.messages = vec![Self::greeting()];
        self.status = Status::Idle;
        self.animate_id = None;
    }

    /// Replace the whole sequence, falling back to the greeting when the
    /// fetched list is empty so the surface never renders an empty view.
    pub fn hydrate(&mut self, list: Vec<Message>) {
        if list.is_empty() {
            self.reset();
        } else {
            self.messages = list;
            self.status = Status::Idle;
            self.animate_id = None;
        }
    }

    /// Mark the newest bot entry as the only one the typewriter animates.
    pub fn mark_animatable(&mut self, id: &str) {
        self.animate_id = Some(id.to_string());
    }

    pub fn should_animate(&self, id: &str) -> bool {
        self.animate_id.as_deref() == Some(id)
    }

    /// The full ordered history as `{role, content}` pairs for the backend.
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_single_greeting() {
        let store = ConversationStore::new();
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].role, Role::Bot);
        assert_eq!(store.messages()[0].content, config::GREETING);
        assert_eq!(*store.status(), Status::Idle);
    }

    #[test]
    fn test_append_pushes_new_ids() {
        let mut store = ConversationStore::new();
        store.append(Message::new(Role::User, "hi", None));
        store.append(Message::new(Role::Bot, "hello", None));
        assert_eq!(store.messages().len(), 3);
        assert_eq!(store.messages()[1].content, "hi");
        assert_eq!(store.messages()[2].content, "hello");
    }

    #[test]
    fn test_append_with_seen_id_replaces_in_place() {
        let mut store = ConversationStore::new();
        let first = Message::new(Role::User, "hi", None);
        store.append(first.clone());
        store.append(Message::new(Role::Bot, "hello", None));

        let mut promoted = first;
        promoted.conversation_id = Some("chat-1".to_string());
        store.append(promoted);

        assert_eq!(store.messages().len(), 3);
        assert_eq!(store.messages()[1].content, "hi");
        assert_eq!(
            store.messages()[1].conversation_id.as_deref(),
            Some("chat-1")
        );
        // order preserved: replaced entry stays at its position
        assert_eq!(store.messages()[2].content, "hello");
    }

    #[test]
    fn test_reset_yields_exactly_one_greeting() {
        let mut store = ConversationStore::new();
        for i in 0..5 {
            store.append(Message::new(Role::User, format!("msg {}", i), None));
        }
        store.set_status(Status::Error("boom".to_string()));

        store.reset();

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, config::GREETING);
        assert_eq!(*store.status(), Status::Idle);
    }

    #[test]
    fn test_hydrate_empty_falls_back_to_greeting() {
        let mut store = ConversationStore::new();
        store.append(Message::new(Role::User, "hi", None));

        store.hydrate(Vec::new());

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, config::GREETING);
    }

    #[test]
    fn test_hydrate_replaces_sequence() {
        let mut store = ConversationStore::new();
        let list = vec![
            Message::new(Role::User, "a", Some("chat-1".to_string())),
            Message::new(Role::Bot, "b", Some("chat-1".to_string())),
        ];
        store.hydrate(list);
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0].content, "a");
    }

    #[test]
    fn test_only_marked_entry_animates() {
        let mut store = ConversationStore::new();
        let old_bot = Message::new(Role::Bot, "earlier", None);
        let new_bot = Message::new(Role::Bot, "latest", None);
        store.append(old_bot.clone());
        store.append(new_bot.clone());
        store.mark_animatable(&new_bot.id);

        assert!(store.should_animate(&new_bot.id));
        assert!(!store.should_animate(&old_bot.id));
    }

    #[test]
    fn test_turns_cover_full_history_in_order() {
        let mut store = ConversationStore::new();
        store.append(Message::new(Role::User, "hi", None));
        let turns = store.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Bot);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "hi");
    }
}
