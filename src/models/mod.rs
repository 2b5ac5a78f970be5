pub mod conversation;
pub mod feedback;
pub mod identity;
pub mod message;

pub use conversation::{derive_title, Conversation};
pub use feedback::Feedback;
pub use identity::Identity;
pub use message::{Message, Role};
