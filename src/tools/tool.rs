//! Tool trait, execution context and closure-based tool wrapper.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::agent::Agent;
use crate::context::ConversationContext;
use crate::error::Result;
use crate::session::{EventSink, Runtime, SessionEvent};

/// What a tool sees while it runs.
#[derive(Clone)]
pub struct ToolContext {
    /// Agent whose run requested the call.
    pub agent: Agent,
    /// Context the run is driving, held locked by the calling session.
    pub context: ConversationContext,
    /// Present when the calling session streams events.
    pub events: Option<EventSink>,
    /// Delegation depth of the calling session.
    pub depth: u32,
    pub runtime: Runtime,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("agent", &self.agent.name())
            .field("context", &self.context.id())
            .field("streaming", &self.events.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

/// One item of a streaming tool's output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolStreamItem {
    /// Intermediate event, forwarded to the caller's stream.
    Progress(SessionEvent),
    /// The tool's output. The last one wins.
    Final(String),
}

/// Result shape of a tool invocation.
pub enum ToolOutput {
    Immediate(String),
    Stream(BoxStream<'static, Result<ToolStreamItem>>),
}

impl ToolOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self::Immediate(output.into())
    }
}

impl fmt::Debug for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(text) => f.debug_tuple("Immediate").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A function the remote assistant can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the assistant calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with parsed arguments.
    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Function definition in the assistants tool format.
    fn definition(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters().schema,
            }
        })
    }
}

type ToolHandler = dyn Fn(ToolArguments, ToolContext) -> Pin<Box<dyn Future<Output = Result<String>> + Send>>
    + Send
    + Sync;

/// Closure-based tool producing immediate text output.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<ToolOutput> {
        (self.handler)(args.clone(), ctx.clone())
            .await
            .map(ToolOutput::Immediate)
    }
}

impl fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
