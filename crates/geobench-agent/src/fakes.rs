//! In-memory completion services (testing only)

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::llm::{CompletionRequest, CompletionService};

/// Answers classification requests (those carrying a system prompt) with one
/// fixed reply and every other request with another.
#[derive(Debug)]
pub struct StaticCompletion {
    intent_reply: String,
    observation_reply: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StaticCompletion {
    pub fn new(intent_reply: &str, observation_reply: &str) -> Self {
        Self {
            intent_reply: intent_reply.to_string(),
            observation_reply: Ok(observation_reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Classification succeeds; the observation request fails with `message`.
    pub fn failing_observation(intent_reply: &str, message: &str) -> Self {
        Self {
            intent_reply: intent_reply.to_string(),
            observation_reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StaticCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let is_classification = request.messages.first().is_some_and(|m| m.role == "system");
        if is_classification {
            return Ok(self.intent_reply.clone());
        }
        self.observation_reply
            .clone()
            .map_err(ServiceError::Http)
    }
}

/// Fails every request.
#[derive(Debug, Clone)]
pub struct FailingCompletion {
    message: String,
}

impl FailingCompletion {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Http(self.message.clone()))
    }
}
