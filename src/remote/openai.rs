//! OpenAI Assistants v2 backend (`/threads`, `/threads/{id}/runs`, ...).

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Method;
use reqwest_eventsource::{Event, EventSource};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::http::{assistants_headers, shared_client, status_to_error};
use super::{
    AssistantsBackend, Attachment, DeltaSink, MessageContent, RemoteRun, ThreadMessage,
    ToolOutputSubmission,
};
use crate::config::ParleyConfig;
use crate::error::{ParleyError, Result};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the assistants thread/run endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiAssistants {
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl OpenAiAssistants {
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

    /// Build from the `openai` credentials of a config.
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        with_timeout(self.timeout, async {
            let mut request = shared_client()
                .request(method.clone(), self.url(path))
                .headers(assistants_headers(&self.api_key));
            if let Some(body) = body {
                request = request.json(body);
            }
            let resp = request.send().await?;

            let status = resp.status().as_u16();
            if !(200..300).contains(&status) {
                let body_text = resp.text().await.unwrap_or_default();
                return Err(status_to_error(status, &body_text));
            }
            Ok(resp.json::<T>().await?)
        })
        .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        debug!(%method, path, "assistants request");
        self.retry_policy
            .execute(|| self.send_once(method.clone(), path, body.as_ref()))
            .await
    }

    /// POST with `"stream": true` and fold the event stream into the final run.
    async fn stream_run(
        &self,
        path: &str,
        mut body: serde_json::Value,
        sink: DeltaSink,
    ) -> Result<RemoteRun> {
        body["stream"] = serde_json::Value::Bool(true);
        debug!(path, "assistants stream request");

        let request = shared_client()
            .post(self.url(path))
            .headers(assistants_headers(&self.api_key))
            .json(&body);
        let mut source = EventSource::new(request)
            .map_err(|e| ParleyError::Stream(format!("cannot open event stream: {e}")))?;
        source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        let mut last_run: Option<RemoteRun> = None;
        while let Some(event) = source.next().await {
            let message = match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => message,
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, resp)) => {
                    source.close();
                    let body_text = resp.text().await.unwrap_or_default();
                    return Err(status_to_error(status.as_u16(), &body_text));
                }
                Err(err) => {
                    source.close();
                    return Err(ParleyError::Stream(err.to_string()));
                }
            };

            match message.event.as_str() {
                "done" => break,
                "error" => {
                    source.close();
                    return Err(ParleyError::Stream(message.data));
                }
                "thread.message.delta" => {
                    if let Ok(delta) = serde_json::from_str::<MessageDeltaEvent>(&message.data) {
                        for text in delta.texts() {
                            sink(text);
                        }
                    }
                }
                name if name.starts_with("thread.run.") && !name.starts_with("thread.run.step.") => {
                    let run: RemoteRun = serde_json::from_str(&message.data)?;
                    debug!(run_id = %run.id, status = %run.status, event = name, "run event");
                    let waiting = run.status == super::RunStatus::RequiresAction;
                    last_run = Some(run);
                    // The service keeps the stream open until outputs arrive on a new request.
                    if waiting {
                        source.close();
                        break;
                    }
                }
                _ => {}
            }
        }

        last_run.ok_or_else(|| ParleyError::Stream("event stream ended without a run".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<MessageContent>,
}

impl MessageDeltaEvent {
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.delta.content.iter().filter_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Unsupported => None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[async_trait]
impl AssistantsBackend for OpenAiAssistants {
    async fn create_thread(&self) -> Result<String> {
        let thread: ThreadObject = self
            .send(Method::POST, "/threads", Some(serde_json::json!({})))
            .await?;
        debug!(thread_id = %thread.id, "thread created");
        Ok(thread.id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .send(Method::DELETE, &format!("/threads/{thread_id}"), None)
            .await?;
        Ok(())
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "role": "user",
            "content": content,
        });
        if !attachments.is_empty() {
            body["attachments"] = serde_json::to_value(attachments)?;
        }
        // Not retried: a late success would post the message twice.
        let _: serde_json::Value = self
            .send_once(
                Method::POST,
                &format!("/threads/{thread_id}/messages"),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RemoteRun> {
        // Not retried: a second run on a thread with an active run is rejected.
        self.send_once(
            Method::POST,
            &format!("/threads/{thread_id}/runs"),
            Some(&serde_json::json!({ "assistant_id": assistant_id })),
        )
        .await
    }

    async fn create_run_streamed(
        &self,
        thread_id: &str,
        assistant_id: &str,
        sink: DeltaSink,
    ) -> Result<RemoteRun> {
        self.stream_run(
            &format!("/threads/{thread_id}/runs"),
            serde_json::json!({ "assistant_id": assistant_id }),
            sink,
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RemoteRun> {
        self.send(
            Method::GET,
            &format!("/threads/{thread_id}/runs/{run_id}"),
            None,
        )
        .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<RemoteRun> {
        // Not retried: a repeated submission races the service's own state change.
        self.send_once(
            Method::POST,
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            Some(&serde_json::json!({ "tool_outputs": outputs })),
        )
        .await
    }

    async fn submit_tool_outputs_streamed(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
        sink: DeltaSink,
    ) -> Result<RemoteRun> {
        self.stream_run(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            serde_json::json!({ "tool_outputs": outputs }),
            sink,
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let list: MessageList = self
            .send(
                Method::GET,
                &format!("/threads/{thread_id}/messages?limit={limit}&order=desc"),
                None,
            )
            .await?;
        Ok(list.data)
    }
}
