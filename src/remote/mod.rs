//! Remote execution service: threads, messages and runs.
//!
//! The session core only talks to [`AssistantsBackend`]; the HTTP
//! implementation lives in [`openai`].

pub mod http;
pub mod types;

#[cfg(feature = "openai")]
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use types::{
    Attachment, FunctionCall, HostedTool, MessageContent, RemoteRun, RequiredAction,
    RequiredToolCall, RunError, RunStatus, SubmitToolOutputs, TextContent, ThreadMessage,
    ToolOutputSubmission,
};

/// Callback receiving assistant text deltas from a streamed run.
pub type DeltaSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Contract of the stateful assistant service the sessions drive.
#[async_trait]
pub trait AssistantsBackend: Send + Sync {
    /// Create an empty thread and return its id.
    async fn create_thread(&self) -> Result<String>;

    /// Delete a thread. Used for discarded one-off contexts.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Append a user message to a thread.
    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<()>;

    /// Start a run and return it as soon as the service accepted it.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RemoteRun>;

    /// Start a run over an event stream, forwarding text deltas to `sink`.
    ///
    /// Returns the run as of the last run event on the stream.
    async fn create_run_streamed(
        &self,
        thread_id: &str,
        assistant_id: &str,
        sink: DeltaSink,
    ) -> Result<RemoteRun>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RemoteRun>;

    /// Answer the tool calls of a run in `requires_action`.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<RemoteRun>;

    /// Streamed variant of [`submit_tool_outputs`](Self::submit_tool_outputs).
    async fn submit_tool_outputs_streamed(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
        sink: DeltaSink,
    ) -> Result<RemoteRun>;

    /// Most recent messages first.
    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>>;
}
