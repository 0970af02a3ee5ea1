//! `SendMessage`: lets an agent open a nested session with another agent.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::info;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext, ToolOutput, ToolStreamItem};
use super::types::ToolParameters;
use crate::agent::{Agent, WeakAgent};
use crate::error::{ParleyError, Result};
use crate::session::{Caller, ConverseOptions, Session};

#[derive(Debug, Deserialize)]
struct SendMessageArgs {
    recipient: String,
    message: String,
    #[serde(default)]
    message_files: Vec<String>,
}

/// Delegates a message to one of a fixed set of recipient agents and returns
/// their answer as the tool output.
///
/// Recipients are held weakly, so agents that message each other do not keep
/// each other alive.
#[derive(Debug)]
pub struct SendMessage {
    recipients: Vec<WeakAgent>,
    description: String,
    parameters: ToolParameters,
}

impl SendMessage {
    pub const NAME: &'static str = "SendMessage";

    pub fn new(recipients: &[Agent]) -> Self {
        let names: Vec<&str> = recipients.iter().map(Agent::name).collect();
        let roster = recipients
            .iter()
            .map(|agent| {
                if agent.description().is_empty() {
                    format!("- {}", agent.name())
                } else {
                    format!("- {}: {}", agent.name(), agent.description())
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let description = format!(
            "Send a message to another agent and wait for its answer. Use it to delegate \
             a task or ask for information the recipient is responsible for. \
             Available recipients:\n{roster}"
        );
        let parameters = ToolParameters::object()
            .string_enum("recipient", "Name of the agent to message.", &names, true)
            .string(
                "message",
                "The task or question for the recipient, with all context it needs.",
                true,
            )
            .string_list(
                "message_files",
                "Ids of uploaded files to attach to the message.",
                false,
            )
            .build();
        Self {
            recipients: recipients.iter().map(Agent::downgrade).collect(),
            description,
            parameters,
        }
    }

    fn resolve(&self, name: &str) -> Result<Agent> {
        self.recipients
            .iter()
            .find(|r| r.name() == name)
            .and_then(WeakAgent::upgrade)
            .ok_or_else(|| {
                let available: Vec<&str> = self.recipients.iter().map(WeakAgent::name).collect();
                ParleyError::InvalidArgument(format!(
                    "Unknown recipient {name}. Available recipients: {available:?}"
                ))
            })
    }
}

#[async_trait]
impl Tool for SendMessage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<ToolOutput> {
        let args: SendMessageArgs = args.deserialize()?;
        let max_depth = ctx.runtime.settings().max_delegation_depth;
        if ctx.depth >= max_depth {
            return Err(ParleyError::InvalidArgument(format!(
                "Delegation depth limit of {max_depth} reached; answer without messaging other agents"
            )));
        }
        let recipient = self.resolve(&args.recipient)?;
        let recipient_name = recipient.name().to_string();
        let depth = ctx.depth + 1;

        info!(
            agent = ctx.agent.name(),
            recipient = %recipient_name,
            thread_id = ctx.context.id(),
            depth,
            "delegating to nested session"
        );

        let caller = Caller::Agent {
            agent: ctx.agent.clone(),
            context: ctx.context.clone(),
        };
        let options = ConverseOptions::builder()
            .message_files(args.message_files)
            .build();
        let mut session = Session::new(ctx.runtime.clone(), caller, recipient).with_depth(depth);

        if ctx.events.is_none() {
            return session
                .converse(&args.message, options)
                .await
                .map(ToolOutput::Immediate)
                .map_err(|e| ParleyError::delegation(recipient_name, e));
        }

        let items = session
            .converse_stream(args.message, options)
            .map(move |item| match item {
                Ok(event) if event.is_final() && event.depth == depth => {
                    Ok(ToolStreamItem::Final(event.content))
                }
                Ok(event) => Ok(ToolStreamItem::Progress(event)),
                Err(e) => Err(ParleyError::delegation(recipient_name.clone(), e)),
            });
        Ok(ToolOutput::Stream(items.boxed()))
    }
}
