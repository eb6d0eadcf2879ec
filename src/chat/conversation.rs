use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Titles longer than this are cut and suffixed with `...`
pub const TITLE_MAX_CHARS: usize = 40;

/// How long the copied indicator stays on
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

pub const UNTITLED: &str = "New conversation";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Agent,
    Error,
}

/// A single entry in a conversation thread
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
    copied_at: Option<Instant>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Local::now(),
            copied_at: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Error, content)
    }

    /// Whether the copied indicator is showing
    pub fn copied(&self) -> bool {
        self.copied_at.is_some()
    }

    pub(crate) fn mark_copied(&mut self, at: Instant) {
        self.copied_at = Some(at);
    }

    /// Clear the indicator once it has been shown long enough.
    pub(crate) fn expire_copied(&mut self, now: Instant) -> bool {
        match self.copied_at {
            Some(at) if now.saturating_duration_since(at) >= COPY_FEEDBACK => {
                self.copied_at = None;
                true
            }
            _ => false,
        }
    }
}

/// An in-memory thread of messages with its agent session id
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Local>,
    pub session_id: String,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: None,
            messages: Vec::new(),
            created_at: Local::now(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Title shown in the sidebar and header
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }

    pub(crate) fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a message. The first message fixes the title for good.
    pub fn push(&mut self, message: ChatMessage) {
        if self.title.is_none() && self.messages.is_empty() {
            self.title = Some(derive_title(&message.content));
        }
        self.messages.push(message);
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<ChatMessage> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn last_with_role(&self, role: MessageRole) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == role)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a conversation title from its first message.
pub fn derive_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_is_kept() {
        assert_eq!(derive_title("Plan today"), "Plan today");
    }

    #[test]
    fn test_title_at_limit_is_not_truncated() {
        let exact = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn test_long_title_truncates_with_ellipsis() {
        let long = "b".repeat(TITLE_MAX_CHARS + 1);
        let title = derive_title(&long);
        assert_eq!(title, format!("{}...", "b".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let thai = "จัดลำดับความสำคัญของงานที่ต้องทำวันนี้ให้หน่อยครับ";
        let title = derive_title(thai);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_title_is_set_once() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.title(), UNTITLED);

        conversation.push(ChatMessage::user("first"));
        conversation.push(ChatMessage::agent("reply"));
        conversation.push(ChatMessage::user("second"));

        assert_eq!(conversation.title(), "first");
    }

    #[test]
    fn test_message_ids_are_unique() {
        let mut conversation = Conversation::new();
        for i in 0..50 {
            conversation.push(ChatMessage::user(format!("task {}", i)));
        }
        let mut ids: Vec<_> = conversation.messages.iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_copied_indicator_expires() {
        let start = Instant::now();
        let mut message = ChatMessage::agent("copy me");
        message.mark_copied(start);
        assert!(message.copied());

        assert!(!message.expire_copied(start + Duration::from_millis(1999)));
        assert!(message.copied());

        assert!(message.expire_copied(start + COPY_FEEDBACK));
        assert!(!message.copied());
    }
}
