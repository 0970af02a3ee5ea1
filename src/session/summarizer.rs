//! Keeps each pooled context's task description current.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::runtime::Runtime;
use crate::context::ConversationContext;
use crate::llm::structured::parse_json;
use crate::llm::CompletionRequest;

const SUMMARIZER_INSTRUCTION: &str = r#"You analyze task conversations and maintain a structured description of each task from its history.
The description is a json object with these fields:
{
    "background": "The context of the task, taken from the first message of the history, in one sentence.",
    "task_content": "What the first message asks to be done, stated concretely.",
    "completion_conditions": "Clear, specific criteria, based only on the first message, that tell when the requested deliverables are complete.",
    "existing_results": ["Qualitative summary of each (intermediate) result the conversation has already produced."],
    "unknown_results": ["Each (intermediate) result the completion conditions require that has not been obtained yet."],
    "status": "Task status judged against the completion conditions, e.g. completed, uncompleted, unable to complete, uncertain."
}
You receive the current description of the task and its most recent history, each under a #### heading.
1. If the current description is empty, generate every field as specified above.
2. Otherwise, update only "existing_results" and "unknown_results" from the recent history:
   - add any new (intermediate) result missing from "existing_results" and remove the matching entry from "unknown_results";
   - add any newly pending result missing from "unknown_results".
Keep the description clear and unambiguous. Output nothing except the json object."#;

/// Structured task description stored on a context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TaskDescription {
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub task_content: String,
    #[serde(default)]
    pub completion_conditions: String,
    #[serde(default)]
    pub existing_results: Vec<String>,
    #[serde(default)]
    pub unknown_results: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl TaskDescription {
    /// Carries something besides the status.
    fn has_content(&self) -> bool {
        !(self.background.trim().is_empty()
            && self.task_content.trim().is_empty()
            && self.completion_conditions.trim().is_empty()
            && self.existing_results.is_empty()
            && self.unknown_results.is_empty())
    }
}

/// Transcript of one turn, as fed to the summarizer.
pub fn exchange_text(message: &str, response: &str) -> String {
    format!("# Message 1:\n {message}\n\n # Message 2:\n{response}\n")
}

/// Normalize a summarizer answer for storage.
///
/// An answer in the expected shape with some content is stored
/// re-serialized; anything else is kept as trimmed text.
pub fn normalize(raw: &str) -> String {
    match parse_json::<TaskDescription>(raw) {
        Ok(description) if description.has_content() => {
            serde_json::to_string(&description).unwrap_or_else(|_| raw.trim().to_string())
        }
        _ => raw.trim().to_string(),
    }
}

/// Refresh `context`'s description from `exchange` and return the stored text.
///
/// Best-effort: a failed request leaves the previous description in place.
pub async fn update(runtime: &Runtime, context: &ConversationContext, exchange: &str) -> String {
    let current = context.task_description();
    let request = CompletionRequest::new(
        runtime.settings().summarizer_model.clone(),
        SUMMARIZER_INSTRUCTION,
    )
    .user(format!(
        "#### Description of Task Session:\n{current}\n#### Recent Task Session History:\n{exchange}"
    ))
    .json();

    match runtime.language().complete(request).await {
        Ok(raw) => {
            let description = normalize(&raw);
            context.set_task_description(description.clone());
            info!(thread_id = context.id(), description = %description, "task description updated");
            description
        }
        Err(e) => {
            warn!(thread_id = context.id(), error = %e, "task description update failed");
            current
        }
    }
}
