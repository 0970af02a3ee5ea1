//! Language-understanding service used for routing and summarizing.

pub mod structured;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One single-shot completion: a system instruction plus user messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user_messages: Vec<String>,
    /// Ask the service for a JSON object response.
    #[serde(default)]
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user_messages: Vec::new(),
            json_output: false,
        }
    }

    pub fn user(mut self, message: impl Into<String>) -> Self {
        self.user_messages.push(message.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Stateless chat completion service.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Return the assistant text of a single completion.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
