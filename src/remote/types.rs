//! Wire types for the assistants thread/run API.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Remote run lifecycle status.
///
/// Statuses this crate does not act on (`cancelling`, `cancelled`,
/// `incomplete`, anything newer) collapse into [`RunStatus::Other`], which the
/// run driver treats as terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Expired,
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Still executing remotely; poll again.
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    /// Ended in a state that consumes retry budget.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Expired)
    }
}

/// A run as reported by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRun {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunError>,
}

impl RemoteRun {
    /// Tool calls the run is waiting on, empty unless `requires_action`.
    pub fn tool_calls(&self) -> &[RequiredToolCall] {
        self.required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or(&[])
    }

    /// Human-readable failure detail for logs and errors.
    pub fn failure_detail(&self) -> String {
        match &self.last_error {
            Some(err) => format!("{}: {}", err.code, err.message),
            None => "no error detail reported".to_string(),
        }
    }
}

/// Error attached to a failed or expired run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<RequiredToolCall>,
}

/// One function call requested by a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredToolCall {
    pub id: String,
    pub function: FunctionCall,
}

impl RequiredToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name plus its JSON-encoded argument string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Output submitted back for a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutputSubmission {
    pub tool_call_id: String,
    pub output: String,
}

/// Hosted capability a file attachment is made available to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostedTool {
    FileSearch,
    CodeInterpreter,
}

/// A previously uploaded file attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub file_id: String,
    pub tools: Vec<HostedTool>,
}

impl Attachment {
    pub fn new(file_id: impl Into<String>, tools: Vec<HostedTool>) -> Self {
        Self {
            file_id: file_id.into(),
            tools,
        }
    }
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Text of the first content part, or `""` when it carries no text.
    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(MessageContent::Text { text }) => &text.value,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    pub value: String,
}
