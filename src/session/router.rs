//! Picks the pooled context a new message belongs to.

use serde::Deserialize;
use tracing::info;

use super::runtime::Runtime;
use crate::agent::Agent;
use crate::context::ConversationContext;
use crate::error::{ParleyError, Result};
use crate::llm::structured::parse_json;
use crate::llm::CompletionRequest;

const CLASSIFIER_INSTRUCTION: &str = r#"You assign incoming messages to ongoing task conversations.
Each conversation involves several participants working on one task. You receive numbered descriptions of the existing conversations (background, task content, completion conditions, status, existing results, unknown results), followed by a new message from one participant.
Choose the conversation the new message most plausibly continues and explain why it belongs there rather than elsewhere.
Answer with a json object of this exact shape:
{
    "context_index": <integer>,
    "reason": "<string>"
}
Use the 1-based number of the chosen conversation as "context_index". If the message does not belong to any existing conversation, set "context_index" to -1.
Output nothing except the json object."#;

#[derive(Debug, Deserialize)]
struct RoutingDecision {
    context_index: i64,
    reason: String,
}

/// Numbered description list sent to the classifier.
pub fn describe_contexts(contexts: &[ConversationContext]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, ctx)| format!("### Description of Context {}:\n{}\n\n", i + 1, ctx.task_description()))
        .collect()
}

/// A validated classifier answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// 0-based index into the pool snapshot; `None` opens a new context.
    pub index: Option<usize>,
    pub reason: String,
}

/// Parse the classifier answer against a snapshot of `count` contexts.
pub fn parse_decision(raw: &str, count: usize) -> Result<Route> {
    let decision: RoutingDecision = parse_json(raw)
        .map_err(|e| ParleyError::routing(format!("unparseable routing decision: {e}"), raw))?;
    if decision.context_index <= 0 {
        return Ok(Route {
            index: None,
            reason: decision.reason,
        });
    }
    let index = decision.context_index as usize;
    if index > count {
        return Err(ParleyError::routing(
            format!(
                "context_index {} is out of range for {count} contexts",
                decision.context_index
            ),
            raw,
        ));
    }
    Ok(Route {
        index: Some(index - 1),
        reason: decision.reason,
    })
}

/// Choose a context of `recipient` for `message`, or `None` to open a new one.
///
/// Does not look at context status; the lease decides.
pub async fn select_context(
    runtime: &Runtime,
    recipient: &Agent,
    sender: &str,
    message: &str,
) -> Result<Option<ConversationContext>> {
    let contexts = recipient.contexts().snapshot();
    if contexts.is_empty() {
        return Ok(None);
    }

    let request = CompletionRequest::new(
        runtime.settings().classifier_model.clone(),
        CLASSIFIER_INSTRUCTION,
    )
    .user(describe_contexts(&contexts))
    .user(format!("### New message\n{sender}: {message}"))
    .json();
    let raw = runtime.language().complete(request).await?;
    let route = parse_decision(&raw, contexts.len())?;

    info!(
        agent = recipient.name(),
        sender,
        candidates = contexts.len(),
        selected = ?route.index.map(|i| i + 1),
        reason = %route.reason,
        "routing decision"
    );
    Ok(route.index.map(|i| contexts[i].clone()))
}
