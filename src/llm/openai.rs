//! OpenAI Chat Completions implementation of [`LanguageService`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{CompletionRequest, LanguageService};
use crate::config::ParleyConfig;
use crate::error::{ParleyError, Result};
use crate::remote::http::{bearer_headers, shared_client, status_to_error};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl OpenAiChat {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &ParleyConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            ParleyError::Authentication("Missing OpenAI API key (OPENAI_API_KEY)".to_string())
        })?;
        Ok(Self::new(api_key, config.base_url()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    fn build_request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({ "role": "system", "content": request.system })];
        messages.extend(
            request
                .user_messages
                .iter()
                .map(|m| serde_json::json!({ "role": "user", "content": m })),
        );

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if request.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }

    async fn complete_once(&self, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        with_timeout(self.timeout, async {
            let resp = shared_client()
                .post(&url)
                .headers(bearer_headers(&self.api_key))
                .json(body)
                .send()
                .await?;

            let status = resp.status().as_u16();
            if status != 200 {
                let body_text = resp.text().await.unwrap_or_default();
                return Err(status_to_error(status, &body_text));
            }

            let data: ChatResponse = resp.json().await?;
            let choice = data
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ParleyError::api(200, "No choices in OpenAI response"))?;
            Ok(choice.message.content.unwrap_or_default())
        })
        .await
    }
}

#[async_trait]
impl LanguageService for OpenAiChat {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = Self::build_request_body(&request);
        debug!(model = %request.model, messages = request.user_messages.len(), "OpenAI complete");
        self.retry_policy
            .execute(|| self.complete_once(&body))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
