use super::models::{AgentRequest, AgentResponse};
use super::{AgentClient, AgentError};
use async_trait::async_trait;
use reqwest::Url;

/// Agent client that POSTs JSON envelopes over HTTP
pub struct HttpAgentClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpAgentClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn call(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(request);

        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The endpoint may still describe the failure in its own envelope.
            if let Ok(envelope) = serde_json::from_str::<AgentResponse>(&body) {
                return Ok(envelope);
            }
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
