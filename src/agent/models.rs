use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a call to the agent endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRequest {
    pub message: String,
    pub agent_id: String,
    pub user_id: String,
    pub session_id: String,
}

/// Envelope returned by the agent endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Reply text carried by a successful envelope, if any
    pub fn text(&self) -> Option<String> {
        self.response.as_ref().and_then(extract_text)
    }
}

#[cfg(test)]
impl AgentResponse {
    pub fn ok(response: Value) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}

/// Pull the reply text out of whatever shape the agent answered with.
pub fn extract_text(response: &Value) -> Option<String> {
    let candidates = [
        response.pointer("/result/response"),
        Some(response),
        response.get("result"),
        response.get("text"),
        response.get("message"),
        response.get("content"),
        response.pointer("/result/text"),
        response.pointer("/result/message"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_snake_case() -> anyhow::Result<()> {
        let request = AgentRequest {
            message: "plan my day".into(),
            agent_id: "agent-1".into(),
            user_id: "user-1".into(),
            session_id: "session-1".into(),
        };

        let value = serde_json::to_value(&request)?;
        assert_eq!(
            value,
            json!({
                "message": "plan my day",
                "agent_id": "agent-1",
                "user_id": "user-1",
                "session_id": "session-1",
            })
        );
        Ok(())
    }

    #[test]
    fn test_envelope_parses_error_form() -> anyhow::Result<()> {
        let envelope: AgentResponse =
            serde_json::from_str(r#"{"success": false, "error": "agent offline"}"#)?;
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("agent offline"));
        assert!(envelope.response.is_none());
        Ok(())
    }

    #[test]
    fn test_extract_prefers_nested_result_response() {
        let value = json!({
            "result": { "response": "## Today\n- emails" },
            "text": "fallback"
        });
        assert_eq!(extract_text(&value).as_deref(), Some("## Today\n- emails"));
    }

    #[test]
    fn test_extract_fallbacks() {
        assert_eq!(extract_text(&json!("bare string")).as_deref(), Some("bare string"));
        assert_eq!(
            extract_text(&json!({ "result": "flat result" })).as_deref(),
            Some("flat result")
        );
        assert_eq!(
            extract_text(&json!({ "message": "from message" })).as_deref(),
            Some("from message")
        );
        assert_eq!(
            extract_text(&json!({ "result": { "text": "nested text" } })).as_deref(),
            Some("nested text")
        );
    }

    #[test]
    fn test_extract_skips_blank_strings() {
        let value = json!({ "result": { "response": "   " }, "content": "real" });
        assert_eq!(extract_text(&value).as_deref(), Some("real"));
        assert_eq!(extract_text(&json!({ "result": {} })), None);
        assert_eq!(extract_text(&json!(null)), None);
    }
}
