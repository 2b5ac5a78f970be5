pub mod chats;
pub mod credentials;
pub mod database;
pub mod dispatcher;
pub mod feedback;
pub mod identity;
pub mod store;

pub use chats::ChatManager;
pub use credentials::CredentialStore;
pub use database::Database;
pub use dispatcher::{MessageDispatcher, SubmitOutcome};
pub use feedback::{FeedbackError, FeedbackService};
pub use identity::SessionResolver;
pub use store::{ConversationStore, SharedStore, Status};
