// Conversation state, independent of any frontend
mod conversation;
mod samples;
mod session;

pub use conversation::{ChatMessage, Conversation, MessageRole, UNTITLED};
pub use samples::PROMPT_SUGGESTIONS;
pub use session::{ChatSession, PendingSend};
