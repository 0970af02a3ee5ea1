//! Executes the tool calls a run requires.

use futures::StreamExt;
use tracing::{debug, warn};

use super::events::EventEmitter;
use super::runtime::Runtime;
use crate::agent::Agent;
use crate::context::ContextLease;
use crate::error::{ParleyError, Result};
use crate::remote::RequiredToolCall;
use crate::tools::{ToolArguments, ToolContext, ToolOutput, ToolStreamItem};

const HELP_LINK_MARKER: &str = "For further information visit";

/// Tool-call executor for one session. Failures become output text for the
/// assistant; only an aborted nested session escapes as an error.
pub(crate) struct ToolDispatcher<'a> {
    pub(crate) runtime: &'a Runtime,
    pub(crate) recipient: &'a Agent,
    pub(crate) events: &'a EventEmitter,
    pub(crate) depth: u32,
}

impl ToolDispatcher<'_> {
    pub(crate) async fn execute(&self, call: &RequiredToolCall, lease: &ContextLease) -> Result<String> {
        match self.try_execute(call, lease).await {
            Ok(output) => Ok(output),
            Err(e @ ParleyError::Delegation { .. }) => Err(e),
            Err(e) => {
                warn!(
                    tool = %call.function.name,
                    thread_id = lease.id(),
                    error = %e,
                    "tool call failed"
                );
                Ok(error_output(&e))
            }
        }
    }

    async fn try_execute(&self, call: &RequiredToolCall, lease: &ContextLease) -> Result<String> {
        let name = &call.function.name;
        let Some(tool) = self.recipient.tool(name) else {
            return Ok(format!(
                "Error: Function {name} not found. Available functions: {:?}",
                self.recipient.tool_names()
            ));
        };
        let args = ToolArguments::parse(&call.function.arguments)?;
        let ctx = ToolContext {
            agent: self.recipient.clone(),
            context: lease.context().clone(),
            events: self.events.sink().cloned(),
            depth: self.depth,
            runtime: self.runtime.clone(),
        };
        debug!(tool = %name, call_id = %call.id, thread_id = lease.id(), "executing tool");

        match tool.execute(&args, &ctx).await? {
            ToolOutput::Immediate(output) => Ok(output),
            ToolOutput::Stream(mut items) => {
                let mut output = String::new();
                while let Some(item) = items.next().await {
                    match item? {
                        ToolStreamItem::Progress(event) => self.events.forward(event),
                        ToolStreamItem::Final(text) => output = text,
                    }
                }
                Ok(output)
            }
        }
    }
}

/// Render an error as tool output, dropping any trailing help link.
pub fn error_output(error: &ParleyError) -> String {
    let text = format!("Error: {error}");
    match text.find(HELP_LINK_MARKER) {
        Some(index) => text[..index].to_string(),
        None => text,
    }
}
