mod http;
mod models;

pub use http::HttpAgentClient;
pub use models::{AgentRequest, AgentResponse};

use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to the agent endpoint
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to reach agent: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode agent response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn call(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError>;
}
