//! Shared test helpers: an in-memory assistants backend and a scripted
//! language service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use parley::config::SessionSettings;
use parley::error::{ParleyError, Result};
use parley::llm::{CompletionRequest, LanguageService};
use parley::remote::{
    AssistantsBackend, Attachment, DeltaSink, MessageContent, RemoteRun, RequiredAction,
    RequiredToolCall, RunError, RunStatus, SubmitToolOutputs, TextContent, ThreadMessage,
    ToolOutputSubmission,
};
use parley::session::Runtime;

pub const CLASSIFIER: &str = "test-classifier";
pub const SUMMARIZER: &str = "test-summarizer";

/// One state a scripted run moves through.
#[derive(Debug, Clone)]
pub enum Step {
    Queued,
    InProgress,
    RequiresAction(Vec<RequiredToolCall>),
    /// Completes the run and posts `reply` as the assistant's message.
    Completed(String),
    Failed(String),
    Expired,
    /// The next tool output submission is rejected.
    RejectSubmission,
}

/// A message posted to a thread, as recorded by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub role: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug)]
struct ScriptedRun {
    run: RemoteRun,
    steps: VecDeque<Step>,
}

#[derive(Debug, Default)]
struct BackendState {
    next_thread: u32,
    next_run: u32,
    scripts: HashMap<String, VecDeque<Vec<Step>>>,
    runs: HashMap<String, ScriptedRun>,
    messages: HashMap<String, Vec<PostedMessage>>,
    runs_per_thread: HashMap<String, u32>,
    submissions: Vec<(String, Vec<ToolOutputSubmission>)>,
    deleted: Vec<String>,
    threads: Vec<String>,
}

/// In-memory assistants backend driven by per-assistant run scripts.
///
/// Each created run takes the next script queued for its assistant (or a
/// single `Completed("ok")` step) and advances one step per create, retrieve
/// or submit call.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<BackendState>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the steps of the next run created for `assistant_id`.
    pub fn script(&self, assistant_id: &str, steps: Vec<Step>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(assistant_id.to_string())
            .or_default()
            .push_back(steps);
    }

    pub fn threads(&self) -> Vec<String> {
        self.state.lock().unwrap().threads.clone()
    }

    pub fn messages(&self, thread_id: &str) -> Vec<PostedMessage> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user_messages(&self, thread_id: &str) -> Vec<String> {
        self.messages(thread_id)
            .into_iter()
            .filter(|m| m.role == "user")
            .map(|m| m.content)
            .collect()
    }

    pub fn runs_created(&self, thread_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .runs_per_thread
            .get(thread_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<(String, Vec<ToolOutputSubmission>)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    fn start(&self, thread_id: &str, assistant_id: &str) -> Result<(RemoteRun, Option<String>)> {
        let mut state = self.state.lock().unwrap();
        if !state.threads.iter().any(|t| t == thread_id) {
            return Err(ParleyError::api(404, format!("No thread found with id '{thread_id}'")));
        }
        let steps = state
            .scripts
            .get_mut(assistant_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| vec![Step::Completed("ok".to_string())]);
        state.next_run += 1;
        let run_id = format!("run_{}", state.next_run);
        *state.runs_per_thread.entry(thread_id.to_string()).or_default() += 1;
        state.runs.insert(
            run_id.clone(),
            ScriptedRun {
                run: RemoteRun {
                    id: run_id.clone(),
                    thread_id: thread_id.to_string(),
                    status: RunStatus::Queued,
                    required_action: None,
                    last_error: None,
                },
                steps: steps.into(),
            },
        );
        Self::advance(&mut state, &run_id)
    }

    /// Move a run to its next scripted state. Returns the run and, when the
    /// run just completed, its reply text.
    fn advance(state: &mut BackendState, run_id: &str) -> Result<(RemoteRun, Option<String>)> {
        let scripted = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ParleyError::api(404, format!("No run found with id '{run_id}'")))?;
        let mut reply = None;
        if let Some(step) = scripted.steps.pop_front() {
            let run = &mut scripted.run;
            run.required_action = None;
            run.last_error = None;
            match step {
                Step::Queued => run.status = RunStatus::Queued,
                Step::InProgress => run.status = RunStatus::InProgress,
                Step::RequiresAction(calls) => {
                    run.status = RunStatus::RequiresAction;
                    run.required_action = Some(RequiredAction {
                        submit_tool_outputs: SubmitToolOutputs { tool_calls: calls },
                    });
                }
                Step::Completed(text) => {
                    run.status = RunStatus::Completed;
                    reply = Some(text);
                }
                Step::Failed(message) => {
                    run.status = RunStatus::Failed;
                    run.last_error = Some(RunError {
                        code: "server_error".to_string(),
                        message,
                    });
                }
                Step::Expired => run.status = RunStatus::Expired,
                Step::RejectSubmission => {
                    return Err(ParleyError::api(400, "Unexpected rejection step"));
                }
            }
        }
        let run = scripted.run.clone();
        if let Some(text) = &reply {
            state
                .messages
                .entry(run.thread_id.clone())
                .or_default()
                .push(PostedMessage {
                    role: "assistant".to_string(),
                    content: text.clone(),
                    attachments: Vec::new(),
                });
        }
        Ok((run, reply))
    }

    fn submit(&self, thread_id: &str, run_id: &str, outputs: &[ToolOutputSubmission]) -> Result<(RemoteRun, Option<String>)> {
        let mut state = self.state.lock().unwrap();
        state
            .submissions
            .push((thread_id.to_string(), outputs.to_vec()));
        let rejected = state
            .runs
            .get_mut(run_id)
            .map(|r| {
                if matches!(r.steps.front(), Some(Step::RejectSubmission)) {
                    r.steps.pop_front();
                    r.run.status = RunStatus::Expired;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if rejected {
            return Err(ParleyError::api(
                400,
                format!("Runs in status \"expired\" do not accept tool outputs ({run_id})"),
            ));
        }
        Self::advance(&mut state, run_id)
    }
}

#[async_trait]
impl AssistantsBackend for ScriptedBackend {
    async fn create_thread(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.next_thread += 1;
        let id = format!("thread_{}", state.next_thread);
        state.threads.push(id.clone());
        Ok(id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.state.lock().unwrap().deleted.push(thread_id.to_string());
        Ok(())
    }

    async fn add_message(&self, thread_id: &str, content: &str, attachments: &[Attachment]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(thread_id.to_string())
            .or_default()
            .push(PostedMessage {
                role: "user".to_string(),
                content: content.to_string(),
                attachments: attachments.to_vec(),
            });
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RemoteRun> {
        self.start(thread_id, assistant_id).map(|(run, _)| run)
    }

    async fn create_run_streamed(&self, thread_id: &str, assistant_id: &str, sink: DeltaSink) -> Result<RemoteRun> {
        let (run, reply) = self.start(thread_id, assistant_id)?;
        if let Some(text) = reply {
            sink(&text);
        }
        Ok(run)
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<RemoteRun> {
        let mut state = self.state.lock().unwrap();
        Self::advance(&mut state, run_id).map(|(run, _)| run)
    }

    async fn submit_tool_outputs(&self, thread_id: &str, run_id: &str, outputs: &[ToolOutputSubmission]) -> Result<RemoteRun> {
        self.submit(thread_id, run_id, outputs).map(|(run, _)| run)
    }

    async fn submit_tool_outputs_streamed(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
        sink: DeltaSink,
    ) -> Result<RemoteRun> {
        let (run, reply) = self.submit(thread_id, run_id, outputs)?;
        if let Some(text) = reply {
            sink(&text);
        }
        Ok(run)
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let state = self.state.lock().unwrap();
        let messages = state.messages.get(thread_id).cloned().unwrap_or_default();
        Ok(messages
            .iter()
            .rev()
            .take(limit as usize)
            .enumerate()
            .map(|(i, m)| ThreadMessage {
                id: format!("msg_{i}"),
                role: m.role.clone(),
                content: vec![MessageContent::Text {
                    text: TextContent {
                        value: m.content.clone(),
                    },
                }],
            })
            .collect())
    }
}

/// Language service answering classifier and summarizer requests from
/// separate queues.
#[derive(Debug, Default)]
pub struct ScriptedLanguageService {
    classifications: Mutex<VecDeque<Result<String>>>,
    summaries: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLanguageService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a routing answer selecting the 1-based `index` (-1 for none).
    pub fn route_to(&self, index: i64) {
        self.classify_raw(format!(
            r#"{{"context_index": {index}, "reason": "scripted"}}"#
        ));
    }

    pub fn classify_raw(&self, raw: impl Into<String>) {
        self.classifications.lock().unwrap().push_back(Ok(raw.into()));
    }

    pub fn summarize_raw(&self, raw: impl Into<String>) {
        self.summaries.lock().unwrap().push_back(Ok(raw.into()));
    }

    pub fn fail_next_summary(&self) {
        self.summaries
            .lock()
            .unwrap()
            .push_back(Err(ParleyError::api(503, "summarizer unavailable")));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn classifier_requests(&self) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.model == CLASSIFIER)
            .collect()
    }
}

#[async_trait]
impl LanguageService for ScriptedLanguageService {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let is_classifier = request.model == CLASSIFIER;
        self.requests.lock().unwrap().push(request);
        if is_classifier {
            self.classifications
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"context_index": -1, "reason": "default"}"#.to_string()))
        } else {
            self.summaries.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(r#"{"background": "scripted", "task_content": "scripted", "status": "uncompleted"}"#.to_string())
            })
        }
    }
}

pub fn test_settings() -> SessionSettings {
    SessionSettings::builder()
        .poll_interval(Duration::from_secs(5))
        .retry_backoff(Duration::from_secs(5))
        .classifier_model(CLASSIFIER)
        .summarizer_model(SUMMARIZER)
        .build()
}

pub fn runtime(backend: &Arc<ScriptedBackend>, language: &Arc<ScriptedLanguageService>) -> Runtime {
    runtime_with(backend, language, test_settings())
}

pub fn runtime_with(
    backend: &Arc<ScriptedBackend>,
    language: &Arc<ScriptedLanguageService>,
    settings: SessionSettings,
) -> Runtime {
    Runtime::new(backend.clone(), language.clone(), settings)
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> RequiredToolCall {
    RequiredToolCall::new(id, name, arguments.to_string())
}
