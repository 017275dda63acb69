//! Conversation layer around the contact classifier.

pub mod agent;
pub mod prompt;
pub mod replies;
pub mod session;
pub mod shortcuts;

pub use agent::{AgentReply, ChatAgent, ReplySource};
pub use prompt::Persona;
pub use session::{ChatSession, ChatTurn, ContactKind, ContactRecord};
pub use shortcuts::ShortcutRules;
