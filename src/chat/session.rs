use std::time::Instant;

use tracing::{debug, warn};
use uuid::Uuid;

use super::conversation::{ChatMessage, Conversation, MessageRole};
use super::samples::sample_conversations;
use crate::agent::{AgentError, AgentRequest, AgentResponse};

pub const EMPTY_REPLY: &str = "Received a response but it had no content.";
pub const CONNECTION_ERROR: &str = "Connection error. Please try again.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";

/// A send that has been recorded locally and still needs an agent reply
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub conversation_id: String,
    pub request: AgentRequest,
}

/// All conversation state for one run of the client
pub struct ChatSession {
    user_id: String,
    agent_id: String,
    conversations: Vec<Conversation>,
    samples: Vec<Conversation>,
    active_id: Option<String>,
    show_samples: bool,
    busy: bool,
}

impl ChatSession {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            conversations: Vec::new(),
            samples: sample_conversations(),
            active_id: None,
            show_samples: false,
            busy: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn shows_samples(&self) -> bool {
        self.show_samples
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    fn viewing_samples(&self) -> bool {
        self.show_samples && self.conversations.is_empty()
    }

    /// Conversations listed in the sidebar, newest first
    pub fn displayed(&self) -> &[Conversation] {
        if self.viewing_samples() {
            &self.samples
        } else {
            &self.conversations
        }
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_id.as_deref()?;
        self.displayed().iter().find(|c| c.id == id)
    }

    fn active_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.active_id.clone()?;
        self.conversation_mut(&id)
    }

    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Start an empty conversation and make it active.
    pub fn new_conversation(&mut self) -> &Conversation {
        let conversation = Conversation::new();
        self.active_id = Some(conversation.id.clone());
        self.conversations.insert(0, conversation);
        &self.conversations[0]
    }

    /// Activate a listed conversation. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.displayed().iter().any(|c| c.id == id) {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn set_show_samples(&mut self, show: bool) {
        self.show_samples = show;
        if show {
            if self.conversations.is_empty() {
                self.active_id = self.samples.first().map(|c| c.id.clone());
            }
        } else {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
    }

    /// Record a user message and return the agent request to issue.
    ///
    /// Empty text and sends while a request is in flight are ignored.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let message = text.trim();
        if message.is_empty() || self.busy {
            return None;
        }

        let has_real_active = self
            .active_id
            .as_deref()
            .map_or(false, |id| self.conversations.iter().any(|c| c.id == id));
        if !has_real_active {
            self.new_conversation();
        }

        let user_id = self.user_id.clone();
        let agent_id = self.agent_id.clone();
        let conversation = self.active_mut()?;
        conversation.push(ChatMessage::user(message));

        let pending = PendingSend {
            conversation_id: conversation.id.clone(),
            request: AgentRequest {
                message: message.to_string(),
                agent_id,
                user_id,
                session_id: conversation.session_id.clone(),
            },
        };

        debug!(
            conversation = %pending.conversation_id,
            session = %pending.request.session_id,
            "dispatching message to agent"
        );
        self.busy = true;
        Some(pending)
    }

    /// Apply the agent outcome to the conversation the send came from.
    pub fn complete(&mut self, pending: &PendingSend, outcome: Result<AgentResponse, AgentError>) {
        self.busy = false;

        let message = match outcome {
            Ok(response) if response.success => {
                ChatMessage::agent(response.text().unwrap_or_else(|| EMPTY_REPLY.to_string()))
            }
            Ok(response) => {
                let error = response
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| CONNECTION_ERROR.to_string());
                warn!(conversation = %pending.conversation_id, %error, "agent reported failure");
                ChatMessage::error(error)
            }
            Err(err) => {
                warn!(conversation = %pending.conversation_id, error = %err, "agent call failed");
                ChatMessage::error(UNEXPECTED_ERROR)
            }
        };

        match self.conversation_mut(&pending.conversation_id) {
            Some(conversation) => conversation.push(message),
            None => warn!(
                conversation = %pending.conversation_id,
                "reply arrived for a conversation that no longer exists"
            ),
        }
    }

    /// Drop an error entry and resend the user text that preceded it.
    pub fn retry(&mut self, error_id: &str) -> Option<PendingSend> {
        if self.busy {
            return None;
        }

        let conversation = self.active_mut()?;
        let position = conversation
            .messages
            .iter()
            .position(|m| m.id == error_id && m.role == MessageRole::Error)?;
        let text = conversation.messages[..position]
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)?
            .content
            .clone();

        conversation.remove(error_id);
        self.begin_send(&text)
    }

    /// Latest error in the active conversation, the default retry target
    pub fn last_error_id(&self) -> Option<String> {
        self.active()?
            .last_with_role(MessageRole::Error)
            .map(|m| m.id.clone())
    }

    /// Latest agent reply in the active conversation
    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.active()?.last_with_role(MessageRole::Agent)
    }

    pub fn mark_copied(&mut self, message_id: &str, now: Instant) -> bool {
        let lists = [&mut self.conversations, &mut self.samples];
        for list in lists {
            for conversation in list.iter_mut() {
                if let Some(message) = conversation.message_mut(message_id) {
                    message.mark_copied(now);
                    return true;
                }
            }
        }
        false
    }

    /// Reset copied indicators that have been shown long enough.
    pub fn expire_copied(&mut self, now: Instant) {
        for conversation in self.conversations.iter_mut().chain(self.samples.iter_mut()) {
            for message in conversation.messages.iter_mut() {
                message.expire_copied(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::conversation::COPY_FEEDBACK;
    use serde_json::json;
    use std::time::Duration;

    fn session() -> ChatSession {
        ChatSession::new("agent-1")
    }

    fn reply(text: &str) -> Result<AgentResponse, AgentError> {
        Ok(AgentResponse::ok(json!({ "result": { "response": text } })))
    }

    #[test]
    fn test_first_send_creates_titled_conversation() {
        let mut session = session();
        let pending = session.begin_send("  Plan my week  ").expect("send accepted");

        assert!(session.is_busy());
        assert_eq!(session.displayed().len(), 1);
        let active = session.active().expect("active conversation");
        assert_eq!(active.title(), "Plan my week");
        assert_eq!(active.messages.len(), 1);
        assert_eq!(pending.request.message, "Plan my week");
        assert_eq!(pending.request.agent_id, "agent-1");
        assert_eq!(pending.request.user_id, session.user_id());
        assert_eq!(pending.request.session_id, active.session_id);
    }

    #[test]
    fn test_empty_send_is_ignored() {
        let mut session = session();
        assert!(session.begin_send("   ").is_none());
        assert!(session.displayed().is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_send_while_busy_is_noop() {
        let mut session = session();
        let _pending = session.begin_send("first").expect("send accepted");

        assert!(session.begin_send("second").is_none());
        let active = session.active().expect("active conversation");
        assert_eq!(active.messages.len(), 1);
        assert_eq!(active.messages[0].content, "first");
    }

    #[test]
    fn test_successful_reply_is_appended() {
        let mut session = session();
        let pending = session.begin_send("sort tasks").expect("send accepted");
        session.complete(&pending, reply("**1.** emails"));

        assert!(!session.is_busy());
        let active = session.active().expect("active conversation");
        assert_eq!(active.messages.len(), 2);
        assert_eq!(active.messages[1].role, MessageRole::Agent);
        assert_eq!(active.messages[1].content, "**1.** emails");
    }

    #[test]
    fn test_empty_success_gets_placeholder() {
        let mut session = session();
        let pending = session.begin_send("hi").expect("send accepted");
        session.complete(&pending, Ok(AgentResponse::ok(json!({}))));

        let last = session.last_reply().expect("agent reply");
        assert_eq!(last.content, EMPTY_REPLY);
    }

    #[test]
    fn test_failure_envelope_becomes_error_message() {
        let mut session = session();
        let pending = session.begin_send("hi").expect("send accepted");
        session.complete(&pending, Ok(AgentResponse::failed("quota exceeded")));

        let active = session.active().expect("active conversation");
        let last = active.messages.last().expect("message");
        assert_eq!(last.role, MessageRole::Error);
        assert_eq!(last.content, "quota exceeded");

        let pending = session.begin_send("again").expect("send accepted");
        session.complete(&pending, Ok(AgentResponse::default()));
        let active = session.active().expect("active conversation");
        assert_eq!(active.messages.last().map(|m| m.content.as_str()), Some(CONNECTION_ERROR));
    }

    #[test]
    fn test_transport_error_becomes_unexpected_error() {
        let mut session = session();
        let pending = session.begin_send("hi").expect("send accepted");
        let outcome = Err(AgentError::Status {
            status: 503,
            body: "down".into(),
        });
        session.complete(&pending, outcome);

        assert!(!session.is_busy());
        let active = session.active().expect("active conversation");
        assert_eq!(active.messages.last().map(|m| m.content.as_str()), Some(UNEXPECTED_ERROR));
    }

    #[test]
    fn test_reply_lands_in_originating_conversation() {
        let mut session = session();
        let pending = session.begin_send("for the first thread").expect("send accepted");
        let origin = pending.conversation_id.clone();

        session.new_conversation();
        session.complete(&pending, reply("done"));

        let active = session.active().expect("active conversation");
        assert!(active.messages.is_empty());
        let origin = session
            .displayed()
            .iter()
            .find(|c| c.id == origin)
            .expect("origin conversation");
        assert_eq!(origin.messages.len(), 2);
    }

    #[test]
    fn test_session_id_is_stable_per_conversation() {
        let mut session = session();
        let first = session.begin_send("one").expect("send accepted");
        session.complete(&first, reply("ok"));
        let second = session.begin_send("two").expect("send accepted");

        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(first.request.session_id, second.request.session_id);
    }

    #[test]
    fn test_retry_removes_error_and_resends() {
        let mut session = session();
        let pending = session.begin_send("sort my inbox").expect("send accepted");
        session.complete(&pending, Ok(AgentResponse::failed("timeout")));

        let error_id = session.last_error_id().expect("error message");
        let retried = session.retry(&error_id).expect("retry accepted");

        assert_eq!(retried.request.message, "sort my inbox");
        assert!(session.is_busy());
        let active = session.active().expect("active conversation");
        assert!(!active.messages.iter().any(|m| m.id == error_id));
        assert!(active.messages.iter().all(|m| m.role != MessageRole::Error));
        assert_eq!(active.messages.len(), 2);
        assert!(active.messages.iter().all(|m| m.content == "sort my inbox"));
    }

    #[test]
    fn test_retry_uses_user_message_before_error() {
        let mut session = session();
        let first = session.begin_send("first ask").expect("send accepted");
        session.complete(&first, Ok(AgentResponse::failed("boom")));
        let error_id = session.last_error_id().expect("error message");

        let second = session.begin_send("second ask").expect("send accepted");
        session.complete(&second, reply("fine"));

        let retried = session.retry(&error_id).expect("retry accepted");
        assert_eq!(retried.request.message, "first ask");
    }

    #[test]
    fn test_retry_ignores_non_errors_and_busy() {
        let mut session = session();
        let pending = session.begin_send("hello").expect("send accepted");
        let user_id = session.active().expect("active").messages[0].id.clone();

        assert!(session.retry(&user_id).is_none());

        session.complete(&pending, Ok(AgentResponse::failed("nope")));
        let error_id = session.last_error_id().expect("error message");
        let _busy = session.begin_send("something else").expect("send accepted");

        assert!(session.retry(&error_id).is_none());
        assert!(session.active().expect("active").messages.iter().any(|m| m.id == error_id));
    }

    #[test]
    fn test_new_conversation_is_listed_first_and_active() {
        let mut session = session();
        let first = session.new_conversation().id.clone();
        let second = session.new_conversation().id.clone();

        let ids: Vec<_> = session.displayed().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![second.clone(), first.clone()]);
        assert_eq!(session.active_id(), Some(second.as_str()));

        assert!(session.select(&first));
        assert_eq!(session.active_id(), Some(first.as_str()));
        assert!(!session.select("missing"));
        assert_eq!(session.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_sample_data_toggle() {
        let mut session = session();
        session.set_show_samples(true);

        assert_eq!(session.displayed().len(), 2);
        assert_eq!(session.active_id(), Some("sample-1"));

        // Sending while viewing samples starts a real conversation.
        let pending = session.begin_send("real work").expect("send accepted");
        assert_ne!(pending.conversation_id, "sample-1");
        assert_eq!(session.displayed().len(), 1);
        assert_eq!(session.active().map(|c| c.title()), Some("real work"));

        session.set_show_samples(false);
        assert_eq!(session.active_id(), Some(pending.conversation_id.as_str()));
    }

    #[test]
    fn test_copied_flag_resets_after_delay() {
        let mut session = session();
        let pending = session.begin_send("copy test").expect("send accepted");
        session.complete(&pending, reply("copy this"));
        let reply_id = session.last_reply().expect("reply").id.clone();

        let now = Instant::now();
        assert!(session.mark_copied(&reply_id, now));
        assert!(session.last_reply().expect("reply").copied());

        session.expire_copied(now + Duration::from_millis(500));
        assert!(session.last_reply().expect("reply").copied());

        session.expire_copied(now + COPY_FEEDBACK);
        assert!(!session.last_reply().expect("reply").copied());
    }
}
